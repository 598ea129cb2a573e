pub mod ljcut;
pub mod none;

pub use ljcut::{LJCut, LJParams, ShiftMode};
pub use none::None_;

use enum_dispatch::enum_dispatch;

use crate::{Atoms, NeighborList, Result};

/// Per-particle results of a force evaluation, for owned particles
#[derive(Clone, Debug, Default)]
pub struct ForceArrays {
    pub forces: Vec<[f64; 3]>,
    /// Potential energy, with each pair split evenly between its particles
    pub energies: Vec<f64>,
    /// Pair virial `r . f`, split the same way
    pub virials: Vec<f64>,
}
impl ForceArrays {
    pub fn zeroed(nlocal: usize) -> Self {
        Self {
            forces: vec![[0.0; 3]; nlocal],
            energies: vec![0.0; nlocal],
            virials: vec![0.0; nlocal],
        }
    }
    pub fn len(&self) -> usize {
        self.forces.len()
    }
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }
}

#[enum_dispatch]
pub enum AtomicPotential {
    LJCut,
    None_,
}

#[enum_dispatch(AtomicPotential)]
/// Trait for pairwise atomic potentials
pub trait AtomicPotentialTrait {
    /// Resolve per type-pair parameters against the particle types of a state
    fn prepare(&mut self, type_names: &[String]) -> Result<()>;

    /// Get the maximum distance for effective interaction
    fn cutoff_distance(&self) -> f64;

    /// Add the pairwise forces of owned particles to `out`
    fn compute_forces(&self, atoms: &Atoms, neighbor_list: &NeighborList, out: &mut ForceArrays);
}
