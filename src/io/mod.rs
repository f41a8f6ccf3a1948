//! Input/output helpers.
//!
//! - specimen ingest from CSV/JSON (`ingest`)
//! - result, specimen and ablation-series exports (`export`)
//! - MetBull submission packages (`metbull`)

pub mod export;
pub mod ingest;
pub mod metbull;

pub use export::*;
pub use ingest::*;
pub use metbull::*;
