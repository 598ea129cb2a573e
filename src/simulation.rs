use std::path::Path;

use log::{debug, info, trace};

use crate::{
    atomic::ForceArrays,
    atoms::{thermal_velocity, ParticleRecord},
    filter::ParticleFilter,
    gsd::Snapshot,
    integrators::IntegrationMethod,
    parallel::{comm, comm::GhostPlans, Domain},
    Atoms, Communicator, Container, Device, Error, Integrator, Operation, Result,
};

/// Rank-local part of the simulation state
pub(crate) struct State {
    pub atoms: Atoms,
    pub domain: Domain,
    pub plans: GhostPlans,
    pub step: u64,
    pub num_particles: usize,
    /// Forces of the current positions, once computed
    pub forces: Option<ForceArrays>,
}

/// The main simulation class, with one copy held by each rank.
pub struct Simulation {
    device: Device,
    seed: u64,
    state: Option<State>,
    integrator: Option<Integrator>,
}
impl Simulation {
    pub fn new(device: Device, seed: u64) -> Self {
        Self {
            device,
            seed,
            state: None,
            integrator: None,
        }
    }

    // Getters
    pub fn device(&self) -> &Device {
        &self.device
    }
    pub fn communicator(&self) -> &Communicator {
        self.device.communicator()
    }
    pub fn rank(&self) -> usize {
        self.device.rank()
    }
    pub fn seed(&self) -> u64 {
        self.seed
    }
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }
    /// Current step, 0 before a state exists
    pub fn timestep(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.step)
    }
    /// Number of particles over all ranks
    pub fn num_particles(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.num_particles)
    }
    pub fn container(&self) -> Option<&Container> {
        self.state.as_ref().map(|s| s.domain.container())
    }
    /// Owned particles of this rank
    pub fn atoms(&self) -> Option<&Atoms> {
        self.state.as_ref().map(|s| &s.atoms)
    }
    /// Process grid of the domain decomposition
    pub fn domain_grid(&self) -> Option<[usize; 3]> {
        self.state.as_ref().map(|s| *s.domain.grid())
    }
    pub fn integrator(&self) -> Option<&Integrator> {
        self.integrator.as_ref()
    }
    pub fn integrator_mut(&mut self) -> Option<&mut Integrator> {
        self.integrator.as_mut()
    }
    pub(crate) fn state(&self) -> Result<&State> {
        self.state
            .as_ref()
            .ok_or_else(|| Error::Config(String::from("the simulation has no state")))
    }

    // Setters
    pub fn set_integrator(&mut self, integrator: Integrator) {
        if let Some(state) = self.state.as_mut() {
            state.forces = None;
        }
        self.integrator = Some(integrator);
    }

    /// Initialize the state from one frame of a GSD file
    pub fn create_state_from_gsd(&mut self, path: impl AsRef<Path>, frame: i64) -> Result<()> {
        let path = path.as_ref();
        if self.state.is_some() {
            return Err(Error::Config(String::from(
                "the simulation already has a state",
            )));
        }
        let snapshot = Snapshot::read(path, frame)?;
        if self.communicator().is_root() {
            info!(
                "read {} particles at step {} from {}",
                snapshot.num_particles(),
                snapshot.step,
                path.display()
            );
        }
        self.create_state_from_snapshot(&snapshot)
    }

    /// Initialize the state from a snapshot; every rank keeps the particles
    /// of its own subdomain
    pub fn create_state_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if self.state.is_some() {
            return Err(Error::Config(String::from(
                "the simulation already has a state",
            )));
        }
        let n = snapshot.num_particles();
        if snapshot.typeid.len() != n
            || snapshot.mass.len() != n
            || snapshot.velocity.len() != n
            || snapshot.image.len() != n
        {
            return Err(Error::Format(String::from(
                "per-particle arrays of the snapshot differ in length",
            )));
        }
        if snapshot.dimensions != 3 {
            return Err(Error::Format(format!(
                "only 3D systems are supported, found dimensions = {}",
                snapshot.dimensions
            )));
        }

        let container = Container::from_gsd_box(&snapshot.box_)?;
        let comm = self.device.communicator();
        let domain = Domain::new(comm.rank(), comm.num_ranks(), &container);
        let mut atoms = Atoms::new(snapshot.types.clone());
        for tag in 0..n {
            let typeid = snapshot.typeid[tag] as usize;
            if typeid >= snapshot.types.len() {
                return Err(Error::Format(format!(
                    "type id {} of particle {} has no type name",
                    typeid, tag
                )));
            }
            let mass = snapshot.mass[tag];
            if !(mass > 0.0 && mass.is_finite()) {
                return Err(Error::Format(format!(
                    "mass of particle {} should be positive, found {}",
                    tag, mass
                )));
            }
            let mut position = snapshot.position[tag];
            if position.iter().any(|x| !x.is_finite()) {
                return Err(Error::Format(format!(
                    "position of particle {} is not finite",
                    tag
                )));
            }
            let mut image = snapshot.image[tag];
            container.wrap(&mut position, &mut image);
            if domain.owns(&position) {
                atoms.push_local(ParticleRecord {
                    tag,
                    typeid,
                    position,
                    velocity: snapshot.velocity[tag],
                    mass,
                    image,
                });
            }
        }

        debug!(
            "rank {} owns {} particles in {:?}",
            comm.rank(),
            atoms.num_local(),
            domain.subdomain()
        );
        if comm.is_root() {
            info!(
                "box {:?} split over a {:?} grid of ranks",
                container.lengths(),
                domain.grid()
            );
        }
        self.state = Some(State {
            atoms,
            domain,
            plans: GhostPlans::default(),
            step: snapshot.step,
            num_particles: n,
            forces: None,
        });
        Ok(())
    }

    /// Advance the simulation by `steps` time steps
    pub fn run(&mut self, steps: u64) -> Result<()> {
        let Self {
            device,
            state,
            integrator,
            ..
        } = self;
        let comm = device.communicator();
        let integrator = integrator
            .as_mut()
            .ok_or_else(|| Error::Integrator(String::from("run requires an integrator")))?;
        let state = state
            .as_mut()
            .ok_or_else(|| Error::Config(String::from("run requires a simulation state")))?;

        state.prepare_run(integrator, comm)?;
        if comm.is_root() {
            info!(
                "running {} steps from step {} with dt = {}",
                steps,
                state.step,
                integrator.dt()
            );
        }
        let builds_before = integrator.neighbor_list().num_builds();
        for _ in 0..steps {
            state.step_once(integrator, comm)?;
        }
        if comm.is_root() {
            info!(
                "finished at step {} after {} neighbor list builds",
                state.step,
                integrator.neighbor_list().num_builds() - builds_before
            );
        }
        Ok(())
    }

    /// Draw velocities of the selected particles from the Maxwell-Boltzmann
    /// distribution at `kt` and remove their center-of-mass momentum
    pub fn thermalize_particle_momenta(&mut self, filter: &ParticleFilter, kt: f64) -> Result<()> {
        let seed = self.seed;
        let comm = self.device.communicator();
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| Error::Config(String::from("the simulation has no state")))?;
        let atoms = &mut state.atoms;
        let selected = filter.local_indices(atoms);

        let mut momentum = [0.0; 4];
        for &i in &selected {
            let mass = atoms.mass(i);
            let v = thermal_velocity(seed, atoms.tags()[i], kt, mass)?;
            atoms.set_velocity(i, v);
            momentum[0] += mass * v[0];
            momentum[1] += mass * v[1];
            momentum[2] += mass * v[2];
            momentum[3] += mass;
        }
        let total = comm.all_reduce(Operation::Sum, momentum.to_vec())?;
        if total[3] > 0.0 {
            let shift = [total[0] / total[3], total[1] / total[3], total[2] / total[3]];
            for &i in &selected {
                atoms.increment_velocity(i, [-shift[0], -shift[1], -shift[2]]);
            }
        }
        Ok(())
    }

    /// Collect the full state on rank 0; other ranks get `None`
    pub fn snapshot(&self) -> Result<Option<Snapshot>> {
        let state = self.state()?;
        let gathered = self
            .device
            .communicator()
            .gather(state.atoms.local_records())?;
        Ok(gathered.map(|records| Snapshot {
            step: state.step,
            dimensions: 3,
            box_: state.domain.container().to_gsd_box(),
            types: state.atoms.type_names().to_vec(),
            typeid: records.iter().map(|r| r.typeid as u32).collect(),
            mass: records.iter().map(|r| r.mass).collect(),
            position: records.iter().map(|r| r.position).collect(),
            velocity: records.iter().map(|r| r.velocity).collect(),
            image: records.iter().map(|r| r.image).collect(),
        }))
    }

    /// Write the current state as a single-frame GSD file from rank 0
    pub fn write_gsd(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(snapshot) = self.snapshot()? {
            snapshot.write(path.as_ref())?;
            info!("wrote {} particles to {}", snapshot.num_particles(), path.as_ref().display());
        }
        self.device.communicator().barrier()
    }
}

impl State {
    /// Validate the setup, place ghosts, build the neighbor list and compute
    /// forces of the current positions
    fn prepare_run(&mut self, integrator: &mut Integrator, comm: &Communicator) -> Result<()> {
        self.atoms.clear_ghosts();
        integrator.prepare(&self.atoms, comm)?;
        self.domain.check_size(integrator.neighbor_list().r_list())?;
        integrator.neighbor_list_mut().invalidate();
        self.rebuild(integrator, comm)?;
        self.forces = Some(integrator.compute_forces(&self.atoms));
        Ok(())
    }

    fn step_once(&mut self, integrator: &mut Integrator, comm: &Communicator) -> Result<()> {
        let dt = integrator.dt();
        let forces = match self.forces.take() {
            Some(f) => f,
            None => integrator.compute_forces(&self.atoms),
        };
        for method in integrator.methods.iter_mut() {
            method.integrate_step_one(&mut self.atoms, &forces, dt);
        }
        self.step += 1;
        self.check_finite()?;

        let nlist = integrator.neighbor_list();
        let rebuild = if nlist.should_check(self.step) {
            let local = if nlist.local_rebuild_needed(&self.atoms) {
                1.0
            } else {
                0.0
            };
            comm.all_reduce_scalar(Operation::Max, local)? > 0.0
        } else {
            false
        };
        if rebuild {
            self.rebuild(integrator, comm)?;
        } else {
            comm::update_ghosts(&mut self.atoms, &self.domain, comm, &self.plans)?;
        }

        let forces = integrator.compute_forces(&self.atoms);
        for method in integrator.methods.iter_mut() {
            method.integrate_step_two(&mut self.atoms, &forces, dt, comm)?;
        }
        self.forces = Some(forces);
        trace!("rank {} completed step {}", comm.rank(), self.step);
        Ok(())
    }

    /// Wrap, migrate, sort and exchange ghosts before building the neighbor list
    fn rebuild(&mut self, integrator: &mut Integrator, comm: &Communicator) -> Result<()> {
        self.atoms.clear_ghosts();
        let container = self.domain.container();
        let nlocal = self.atoms.num_local();
        for (position, image) in self.atoms.positions[..nlocal]
            .iter_mut()
            .zip(self.atoms.images.iter_mut())
        {
            container.wrap(position, image);
        }
        let num_migrated = comm::migrate(&mut self.atoms, &self.domain, comm)?;

        let r_list = integrator.neighbor_list().r_list();
        let bins = integrator.neighbor_list().bins(self.domain.subdomain());
        self.atoms.sort_atoms_by_bin(&bins);
        comm::exchange_ghosts(&mut self.atoms, &self.domain, comm, r_list, &mut self.plans)?;
        integrator
            .neighbor_list_mut()
            .build(&self.atoms, self.domain.subdomain(), self.step);
        debug!(
            "rank {} rebuilt neighbor list at step {}: {} owned, {} ghosts, {} migrated",
            comm.rank(),
            self.step,
            self.atoms.num_local(),
            self.atoms.num_ghosts(),
            num_migrated
        );
        Ok(())
    }

    fn check_finite(&self) -> Result<()> {
        let positions = &self.atoms.positions()[..self.atoms.num_local()];
        match positions.iter().position(|p| p.iter().any(|x| !x.is_finite())) {
            Some(i) => Err(Error::Numerical(format!(
                "particle {} has a non-finite position at step {}",
                self.atoms.tags()[i],
                self.step
            ))),
            None => Ok(()),
        }
    }
}
