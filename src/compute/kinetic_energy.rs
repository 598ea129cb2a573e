use crate::{filter::ParticleFilter, utils::dot, Atoms};

/// Kinetic energy of the owned particles selected by `filter`
pub(super) fn compute(atoms: &Atoms, filter: &ParticleFilter) -> f64 {
    filter
        .local_indices(atoms)
        .into_iter()
        .map(|i| {
            let v = &atoms.velocities()[i];
            0.5 * atoms.mass(i) * dot(v, v)
        })
        .fold(0.0, |acc, e| acc + e)
}
