use std::{io::Write, path::Path};

use log::info;

use crate::{
    atomic::{LJCut, LJParams},
    compute::ThermodynamicQuantities,
    config::RunConfig,
    filter::ParticleFilter,
    integrators::Nvt,
    lattice::{lattice_snapshot, Cubic},
    Device, Integrator, NeighborList, Result, Simulation,
};

/// Build the LJ pair force described by `config`
pub fn lj_from_config(config: &RunConfig) -> LJCut {
    let mut lj = LJCut::new(None, config.lj.mode);
    for pair in &config.lj.pairs {
        let key = (pair.types[0].as_str(), pair.types[1].as_str());
        lj.params.set(
            key,
            LJParams {
                epsilon: pair.epsilon,
                sigma: pair.sigma,
            },
        );
        lj.r_cut.set(key, pair.r_cut);
    }
    lj
}

/// Load a checkpoint, run an LJ fluid under NVT and return the final
/// kinetic energy. Collective: every rank runs it and gets the same value.
pub fn lj_nvt(device: Device, config: &RunConfig) -> Result<f64> {
    let mut sim = Simulation::new(device, config.seed);
    sim.create_state_from_gsd(&config.input, config.frame)?;
    if let Some(kt) = config.thermalize_kt {
        sim.thermalize_particle_momenta(&ParticleFilter::All, kt)?;
    }

    let mut integrator = Integrator::new(config.dt, NeighborList::cell(config.buffer)?)?;
    integrator.forces.push(lj_from_config(config).into());
    integrator
        .methods
        .push(Nvt::new(ParticleFilter::All, config.nvt.kt, config.nvt.tau)?.into());
    sim.set_integrator(integrator);

    sim.run(config.steps)?;

    let thermo = ThermodynamicQuantities::new(ParticleFilter::All);
    let ke = thermo.kinetic_energy(&sim)?;
    let values = thermo.compute(&sim)?;
    if sim.communicator().is_root() {
        info!(
            "step {}: KE = {}, PE = {}, T = {}, P = {}",
            values.step,
            values.kinetic_energy,
            values.potential_energy,
            values.kinetic_temperature,
            values.pressure
        );
    }
    if let Some(output) = &config.output {
        sim.write_gsd(output)?;
    }
    Ok(ke)
}

/// Write `value` on its own line from rank 0 only; returns whether this
/// rank wrote
pub fn report(rank: usize, value: f64, out: &mut impl Write) -> std::io::Result<bool> {
    if rank != 0 {
        return Ok(false);
    }
    writeln!(out, "{}", value)?;
    Ok(true)
}

/// Write a simple cubic configuration with thermal velocities at `kt`
pub fn init_lattice(
    path: impl AsRef<Path>,
    num_particles: usize,
    spacing: f64,
    kt: f64,
    seed: u64,
) -> Result<()> {
    let snapshot = lattice_snapshot(&Cubic::new(spacing)?, num_particles)?;
    let mut sim = Simulation::new(Device::cpu(), seed);
    sim.create_state_from_snapshot(&snapshot)?;
    sim.thermalize_particle_momenta(&ParticleFilter::All, kt)?;
    sim.write_gsd(path)
}
