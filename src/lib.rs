//! `meteorica` library crate: the Extraterrestrial Material Index (EMI).
//!
//! Seven independent parameter calculators score a specimen's mineralogy,
//! shock, weathering, isotopes, atmospheric entry, siderophile chemistry and
//! cosmogenic nuclides; the `emi` module normalizes and combines them into a
//! single index and a classification level.
//!
//! The binary (`emi`) is a thin wrapper around this library so the pipeline is
//! testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod emi;
pub mod error;
pub mod io;
pub mod math;
pub mod params;
pub mod reference;
pub mod report;
