//! Static reference data: group centroids, geochemical constants, materials.
//!
//! Everything here is read-only and compiled in; calculators look values up by
//! enum instead of by string.

pub mod groups;
pub mod materials;
pub mod nuclides;

pub use groups::*;
pub use materials::*;
pub use nuclides::*;
