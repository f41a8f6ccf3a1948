//! Numerical kernels: distances, ODE stepping, grids and 1-D search.

pub mod distance;
pub mod ode;
pub mod search;

pub use distance::*;
pub use ode::*;
pub use search::*;
