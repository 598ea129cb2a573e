pub use super::atomic::{AtomicPotential, AtomicPotentialTrait, LJCut, LJParams, ShiftMode};
pub use super::compute::{ThermoValues, ThermodynamicQuantities};
pub use super::config::RunConfig;
pub use super::container::Container;
pub use super::filter::ParticleFilter;
pub use super::gsd::Snapshot;
pub use super::integrators::{IntegrationMethod, Integrator, Method, Nve, Nvt};
pub use super::lattice::{Cubic, Lattice};
pub use super::mdrun::Mdrun;
pub use super::neighbor::{NeighborList, UpdateSettings};
pub use super::parallel::{Communicator, Device, Operation};
pub use super::simulation::Simulation;
pub use super::{Error, Result};
