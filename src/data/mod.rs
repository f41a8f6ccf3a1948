//! Synthetic data sources.

pub mod sample;
