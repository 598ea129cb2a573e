use crate::{filter::ParticleFilter, Error, Operation, Result, Simulation};

mod kinetic_energy;
mod potential_energy;
mod pressure;
mod temperature;

pub use temperature::translational_dof;

/// All thermodynamic quantities of a group at one step
#[derive(Clone, Debug, PartialEq)]
pub struct ThermoValues {
    pub step: u64,
    pub num_particles: usize,
    pub degrees_of_freedom: f64,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub kinetic_temperature: f64,
    pub pressure: f64,
    pub volume: f64,
}

/// Thermodynamic quantities of the particles selected by a filter.
///
/// Every query is collective: all ranks must call it, and all receive the
/// same value.
#[derive(Clone, Debug)]
pub struct ThermodynamicQuantities {
    filter: ParticleFilter,
}
impl ThermodynamicQuantities {
    pub fn new(filter: ParticleFilter) -> Self {
        Self { filter }
    }
    pub fn filter(&self) -> &ParticleFilter {
        &self.filter
    }

    /// Total kinetic energy `sum(m v^2 / 2)` of the group
    pub fn kinetic_energy(&self, sim: &Simulation) -> Result<f64> {
        let state = sim.state()?;
        let local = kinetic_energy::compute(&state.atoms, &self.filter);
        let ke = sim
            .communicator()
            .all_reduce_scalar(Operation::Sum, local)?;
        check_finite("kinetic energy", ke)
    }

    /// Number of particles in the group
    pub fn num_particles(&self, sim: &Simulation) -> Result<usize> {
        let state = sim.state()?;
        let local = self.filter.local_indices(&state.atoms).len() as f64;
        let n = sim
            .communicator()
            .all_reduce_scalar(Operation::Sum, local)?;
        Ok(n as usize)
    }

    pub fn degrees_of_freedom(&self, sim: &Simulation) -> Result<f64> {
        let n_group = self.num_particles(sim)?;
        Ok(translational_dof(n_group, sim.num_particles()))
    }

    pub fn kinetic_temperature(&self, sim: &Simulation) -> Result<f64> {
        let values = self.compute(sim)?;
        Ok(values.kinetic_temperature)
    }

    /// Potential energy of the group; needs forces from a run
    pub fn potential_energy(&self, sim: &Simulation) -> Result<f64> {
        let values = self.compute(sim)?;
        Ok(values.potential_energy)
    }
    pub fn pressure(&self, sim: &Simulation) -> Result<f64> {
        let values = self.compute(sim)?;
        Ok(values.pressure)
    }

    /// Evaluate all quantities with a single reduction
    pub fn compute(&self, sim: &Simulation) -> Result<ThermoValues> {
        let state = sim.state()?;
        let forces = state.forces.as_ref().ok_or_else(|| {
            Error::Integrator(String::from(
                "forces have not been computed yet; run the simulation first",
            ))
        })?;
        let local = [
            kinetic_energy::compute(&state.atoms, &self.filter),
            potential_energy::compute(&state.atoms, &self.filter, forces),
            pressure::virial(&state.atoms, &self.filter, forces),
            self.filter.local_indices(&state.atoms).len() as f64,
        ];
        let reduced = sim
            .communicator()
            .all_reduce(Operation::Sum, local.to_vec())?;
        let (ke, pe, virial, n_group) = (reduced[0], reduced[1], reduced[2], reduced[3] as usize);

        let dof = translational_dof(n_group, sim.num_particles());
        let volume = state.domain.container().volume();
        Ok(ThermoValues {
            step: state.step,
            num_particles: n_group,
            degrees_of_freedom: dof,
            kinetic_energy: check_finite("kinetic energy", ke)?,
            potential_energy: check_finite("potential energy", pe)?,
            kinetic_temperature: temperature::compute(ke, dof),
            pressure: pressure::compute(ke, virial, volume),
            volume,
        })
    }
}

fn check_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Numerical(format!("{} is {}", name, value)))
    }
}
