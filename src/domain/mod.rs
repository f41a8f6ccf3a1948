//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parameter identifiers and per-parameter tables (`Parameter`, `PerParameter`)
//! - specimen measurement records (`Specimen` and its sections)
//! - calculator and pipeline outputs (`ParameterScore`, `ClassificationResult`, etc.)

pub mod specimen;
pub mod types;

pub use specimen::*;
pub use types::*;
