use super::{AtomicPotentialTrait, ForceArrays};
use crate::{Atoms, NeighborList, Result};

/// No interaction at all, an ideal gas
#[derive(Clone, Debug, Default)]
pub struct None_ {}
impl None_ {
    pub fn new() -> Self {
        Self {}
    }
}
impl AtomicPotentialTrait for None_ {
    fn prepare(&mut self, _type_names: &[String]) -> Result<()> {
        Ok(())
    }
    fn cutoff_distance(&self) -> f64 {
        0.0
    }
    fn compute_forces(&self, _atoms: &Atoms, _neighbor_list: &NeighborList, _out: &mut ForceArrays) {}
}
