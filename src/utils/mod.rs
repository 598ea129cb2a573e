/// Group of useful computations
pub mod computations;
mod direction;
/// Sorting algorithms
pub mod sort;
pub mod type_pair;

pub use computations::*;
pub use direction::{Axis, Direction};
pub use sort::*;
pub use type_pair::{TypePair, TypePairMap};
