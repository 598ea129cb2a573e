/// Translational degrees of freedom of a group of `n_group` out of
/// `n_total` particles, less the share of the conserved total momentum
pub fn translational_dof(n_group: usize, n_total: usize) -> f64 {
    if n_total == 0 {
        return 0.0;
    }
    let n_group = n_group as f64;
    3.0 * n_group - 3.0 * n_group / n_total as f64
}

pub(super) fn compute(kinetic_energy: f64, dof: f64) -> f64 {
    if dof > 0.0 {
        2.0 * kinetic_energy / dof
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dof_of_groups() {
        assert_eq!(translational_dof(0, 0), 0.0);
        assert_eq!(translational_dof(1, 1), 0.0);
        assert_eq!(translational_dof(100, 100), 297.0);
        assert_eq!(compute(1.5, 0.0), 0.0);
        assert_eq!(compute(3.0, 2.0), 3.0);
    }
}
