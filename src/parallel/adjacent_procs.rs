use crate::Direction;

/// Ranks of the six neighboring subdomains, indexed by exchange direction.
///
/// On a periodic axis with a single subdomain both neighbors are the
/// rank itself; with two subdomains they are the same other rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacentProcs {
    ranks: [usize; 6],
}
impl AdjacentProcs {
    pub fn new(my_idx: &[usize; 3], grid: &[usize; 3]) -> Self {
        let mut ranks = [0; 6];
        for direction in Direction::STAGES {
            let axis = direction.axis().index();
            let n = grid[axis];
            let mut idx = *my_idx;
            idx[axis] = if direction.is_lo() {
                (my_idx[axis] + n - 1) % n
            } else {
                (my_idx[axis] + 1) % n
            };
            ranks[direction.index()] = super::domain::multi_to_linear(&idx, grid);
        }
        Self { ranks }
    }
    pub fn get(&self, direction: Direction) -> usize {
        self.ranks[direction.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around_the_grid() {
        let procs = AdjacentProcs::new(&[0, 1, 0], &[3, 2, 1]);
        // rank = x * ny * nz + y * nz + z
        assert_eq!(procs.get(Direction::Xlo), 2 * 2 + 1);
        assert_eq!(procs.get(Direction::Xhi), 2 + 1);
        assert_eq!(procs.get(Direction::Ylo), 0);
        assert_eq!(procs.get(Direction::Yhi), 0);
        assert_eq!(procs.get(Direction::Zlo), 1);
        assert_eq!(procs.get(Direction::Zhi), 1);
    }
}
