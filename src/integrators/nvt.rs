use log::trace;

use super::*;
use crate::parallel::Operation;

/// Nosé-Hoover thermostat in the MTK form.
///
/// `xi` is the thermostat momentum and `eta` its integrated position.
#[derive(Clone, Debug)]
pub struct Nvt {
    filter: ParticleFilter,
    kt: f64,
    tau: f64,
    xi: f64,
    eta: f64,
    ndof: f64,
}
impl Nvt {
    pub fn new(filter: ParticleFilter, kt: f64, tau: f64) -> Result<Self> {
        if !(kt > 0.0 && kt.is_finite()) {
            return Err(Error::Integrator(format!(
                "NVT kT should be positive, found {}",
                kt
            )));
        }
        if !(tau > 0.0 && tau.is_finite()) {
            return Err(Error::Integrator(format!(
                "NVT tau should be positive, found {}",
                tau
            )));
        }
        Ok(Self {
            filter,
            kt,
            tau,
            xi: 0.0,
            eta: 0.0,
            ndof: 0.0,
        })
    }

    pub fn kt(&self) -> f64 {
        self.kt
    }
    pub fn tau(&self) -> f64 {
        self.tau
    }
    pub fn xi(&self) -> f64 {
        self.xi
    }
    pub fn eta(&self) -> f64 {
        self.eta
    }
    /// Degrees of freedom of the thermostatted group, set when a run starts
    pub fn degrees_of_freedom(&self) -> f64 {
        self.ndof
    }
    /// Energy stored in the thermostat, which makes `KE + PE + this` conserved
    pub fn thermostat_energy(&self) -> f64 {
        self.ndof * self.kt * (0.5 * self.tau * self.tau * self.xi * self.xi + self.eta)
    }

    fn exp_fac(&self, dt: f64) -> f64 {
        (-0.5 * self.xi * dt).exp()
    }
}

impl IntegrationMethod for Nvt {
    fn filter(&self) -> &ParticleFilter {
        &self.filter
    }

    fn prepare(&mut self, atoms: &Atoms, comm: &Communicator) -> Result<()> {
        let selected = self.filter.local_indices(atoms).len() as f64;
        let counts = comm.all_reduce(
            Operation::Sum,
            vec![selected, atoms.num_local() as f64],
        )?;
        let (n_group, n_total) = (counts[0], counts[1]);
        self.ndof = if n_total > 0.0 {
            3.0 * n_group - 3.0 * n_group / n_total
        } else {
            0.0
        };
        Ok(())
    }

    fn integrate_step_one(&mut self, atoms: &mut Atoms, forces: &ForceArrays, dt: f64) {
        let exp_fac = self.exp_fac(dt);
        let half_ts = 0.5 * dt;
        for i in self.filter.local_indices(atoms) {
            let mass = atoms.mass(i);
            let v = atoms.velocities()[i];
            let f = forces.forces[i];
            let new_vel = [
                v[0] * exp_fac + half_ts * f[0] / mass,
                v[1] * exp_fac + half_ts * f[1] / mass,
                v[2] * exp_fac + half_ts * f[2] / mass,
            ];
            atoms.set_velocity(i, new_vel);
            atoms.increment_position(i, [dt * new_vel[0], dt * new_vel[1], dt * new_vel[2]]);
        }
    }

    fn integrate_step_two(
        &mut self,
        atoms: &mut Atoms,
        forces: &ForceArrays,
        dt: f64,
        comm: &Communicator,
    ) -> Result<()> {
        let exp_fac = self.exp_fac(dt);
        let half_ts = 0.5 * dt;
        let mut local_ke = 0.0;
        for i in self.filter.local_indices(atoms) {
            let mass = atoms.mass(i);
            let v = atoms.velocities()[i];
            let f = forces.forces[i];
            let new_vel = [
                (v[0] + half_ts * f[0] / mass) * exp_fac,
                (v[1] + half_ts * f[1] / mass) * exp_fac,
                (v[2] + half_ts * f[2] / mass) * exp_fac,
            ];
            atoms.set_velocity(i, new_vel);
            local_ke += 0.5 * mass * crate::utils::dot(&new_vel, &new_vel);
        }

        let ke = comm.all_reduce_scalar(Operation::Sum, local_ke)?;
        if self.ndof > 0.0 {
            let temperature = 2.0 * ke / self.ndof;
            self.xi += dt / (self.tau * self.tau) * (temperature / self.kt - 1.0);
            self.eta += self.xi * dt;
            trace!("NVT T = {}, xi = {}, eta = {}", temperature, self.xi, self.eta);
        }
        Ok(())
    }
}
