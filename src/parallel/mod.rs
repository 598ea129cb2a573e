mod adjacent_procs;
mod communicator;
mod domain;

pub(crate) mod comm;
pub(crate) mod message;

pub(crate) use adjacent_procs::AdjacentProcs;
pub use communicator::{Communicator, Device};
pub(crate) use domain::Domain;
pub use domain::procs_in_box;
pub use message::Operation;
