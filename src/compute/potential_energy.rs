use crate::{atomic::ForceArrays, filter::ParticleFilter, Atoms};

pub(super) fn compute(atoms: &Atoms, filter: &ParticleFilter, forces: &ForceArrays) -> f64 {
    filter
        .local_indices(atoms)
        .into_iter()
        .map(|i| forces.energies[i])
        .fold(0.0, |acc, e| acc + e)
}
