mod nve;
mod nvt;
pub use nve::Nve;
pub use nvt::Nvt;

use enum_dispatch::enum_dispatch;

use crate::{
    atomic::{AtomicPotential, AtomicPotentialTrait, ForceArrays},
    filter::ParticleFilter,
    Atoms, Communicator, Error, NeighborList, Result,
};

#[enum_dispatch]
pub enum Method {
    Nve,
    Nvt,
}

#[enum_dispatch(Method)]
/// Trait for integration methods acting on a group of particles.
///
/// A step is split around the force evaluation: `integrate_step_one` runs
/// before positions are communicated and forces computed, and
/// `integrate_step_two` after.
pub trait IntegrationMethod {
    fn filter(&self) -> &ParticleFilter;

    /// Called once at the start of every run
    fn prepare(&mut self, atoms: &Atoms, comm: &Communicator) -> Result<()>;

    fn integrate_step_one(&mut self, atoms: &mut Atoms, forces: &ForceArrays, dt: f64);

    fn integrate_step_two(
        &mut self,
        atoms: &mut Atoms,
        forces: &ForceArrays,
        dt: f64,
        comm: &Communicator,
    ) -> Result<()>;
}

/// Steps the velocities of the selected particles by half a timestep
pub(crate) fn increment_velocity_halfstep(
    atoms: &mut Atoms,
    filter: &ParticleFilter,
    forces: &ForceArrays,
    dt: f64,
) {
    let half_ts = 0.5 * dt;
    for i in filter.local_indices(atoms) {
        let mass = atoms.mass(i);
        atoms.increment_velocity(
            i,
            [
                half_ts * forces.forces[i][0] / mass,
                half_ts * forces.forces[i][1] / mass,
                half_ts * forces.forces[i][2] / mass,
            ],
        );
    }
}

/// Steps the positions of the selected particles forward
pub(crate) fn increment_positions(atoms: &mut Atoms, filter: &ParticleFilter, dt: f64) {
    for i in filter.local_indices(atoms) {
        let vel = atoms.velocities()[i];
        atoms.increment_position(i, [dt * vel[0], dt * vel[1], dt * vel[2]]);
    }
}

/// Time step, pair forces and integration methods of a simulation
pub struct Integrator {
    dt: f64,
    neighbor_list: NeighborList,
    pub forces: Vec<AtomicPotential>,
    pub methods: Vec<Method>,
}
impl Integrator {
    pub fn new(dt: f64, neighbor_list: NeighborList) -> Result<Self> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(Error::Integrator(format!(
                "time step should be positive, found {}",
                dt
            )));
        }
        Ok(Self {
            dt,
            neighbor_list,
            forces: Vec::new(),
            methods: Vec::new(),
        })
    }

    // Getters
    pub fn dt(&self) -> f64 {
        self.dt
    }
    pub fn neighbor_list(&self) -> &NeighborList {
        &self.neighbor_list
    }
    pub(crate) fn neighbor_list_mut(&mut self) -> &mut NeighborList {
        &mut self.neighbor_list
    }
    /// The NVT method, if one is attached
    pub fn nvt(&self) -> Option<&Nvt> {
        self.methods.iter().find_map(|m| match m {
            Method::Nvt(nvt) => Some(nvt),
            _ => None,
        })
    }

    /// Validate forces and methods against the particle types of a state
    pub(crate) fn prepare(&mut self, atoms: &Atoms, comm: &Communicator) -> Result<()> {
        for force in self.forces.iter_mut() {
            force.prepare(atoms.type_names())?;
        }
        let r_cut = self
            .forces
            .iter()
            .map(|f| f.cutoff_distance())
            .fold(0.0, f64::max);
        self.neighbor_list.set_r_cut(r_cut);

        for i in 0..atoms.num_local() {
            let count = self
                .methods
                .iter()
                .filter(|m| m.filter().selects(atoms, i))
                .count();
            if count > 1 {
                return Err(Error::Integrator(format!(
                    "particle {} is selected by {} integration methods",
                    atoms.tags()[i],
                    count
                )));
            }
        }
        for method in self.methods.iter_mut() {
            method.prepare(atoms, comm)?;
        }
        Ok(())
    }

    pub(crate) fn compute_forces(&self, atoms: &Atoms) -> ForceArrays {
        let mut out = ForceArrays::zeroed(atoms.num_local());
        for force in &self.forces {
            force.compute_forces(atoms, &self.neighbor_list, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_time_steps() {
        let nlist = NeighborList::cell(0.4).unwrap();
        assert!(Integrator::new(0.0, nlist.clone()).is_err());
        assert!(Integrator::new(f64::NAN, nlist.clone()).is_err());
        let integrator = Integrator::new(0.005, nlist).unwrap();
        assert_eq!(integrator.dt(), 0.005);
        assert!(integrator.nvt().is_none());
    }
}
