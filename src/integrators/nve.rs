use super::*;

/// Velocity-verlet integration at constant energy
#[derive(Clone, Debug)]
pub struct Nve {
    filter: ParticleFilter,
}
impl Nve {
    pub fn new(filter: ParticleFilter) -> Self {
        Self { filter }
    }
}

impl IntegrationMethod for Nve {
    fn filter(&self) -> &ParticleFilter {
        &self.filter
    }
    fn prepare(&mut self, _atoms: &Atoms, _comm: &Communicator) -> Result<()> {
        Ok(())
    }
    fn integrate_step_one(&mut self, atoms: &mut Atoms, forces: &ForceArrays, dt: f64) {
        increment_velocity_halfstep(atoms, &self.filter, forces, dt);
        increment_positions(atoms, &self.filter, dt);
    }
    fn integrate_step_two(
        &mut self,
        atoms: &mut Atoms,
        forces: &ForceArrays,
        dt: f64,
        _comm: &Communicator,
    ) -> Result<()> {
        increment_velocity_halfstep(atoms, &self.filter, forces, dt);
        Ok(())
    }
}
