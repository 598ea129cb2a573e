pub mod atomic;
pub mod atoms;
pub mod compute;
pub mod config;
pub mod container;
pub mod error;
pub mod filter;
pub mod gsd;
pub mod integrators;
pub mod lattice;
pub mod mdrun;
pub mod neighbor;
pub mod parallel;
pub mod prelude;
pub mod region;
pub mod script;
pub mod simulation;
pub mod utils;

pub use atomic::*;
pub use atoms::Atoms;
pub use container::Container;
pub use error::{Error, Result};
pub use integrators::*;
pub use mdrun::Mdrun;
pub use neighbor::NeighborList;
pub use parallel::{Communicator, Device, Operation};
pub use simulation::Simulation;
pub use utils::{Axis, Direction};
