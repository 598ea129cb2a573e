use crate::{atomic::ForceArrays, filter::ParticleFilter, Atoms};

/// Pair virial `sum(r_ij . f_ij)` carried by the selected particles
pub(super) fn virial(atoms: &Atoms, filter: &ParticleFilter, forces: &ForceArrays) -> f64 {
    filter
        .local_indices(atoms)
        .into_iter()
        .map(|i| forces.virials[i])
        .fold(0.0, |acc, w| acc + w)
}

/// `P = (2 KE / 3 + W / 3) / V`
pub(super) fn compute(kinetic_energy: f64, virial: f64, volume: f64) -> f64 {
    (2.0 / 3.0 * kinetic_energy + virial / 3.0) / volume
}
