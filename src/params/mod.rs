//! The seven EMI parameter calculators.
//!
//! Every calculator is a pure function of one specimen section and its config
//! table, returning a typed result that converts into a `ParameterScore`.

pub mod atp;
pub mod cnea;
pub mod iaf;
pub mod mcc;
pub mod pbdr;
pub mod smg;
pub mod twi;

pub use atp::{AtpConfig, AtpResult, Termination, ThermalRegime, TrajectorySample, calculate_atp};
pub use cnea::{CneaConfig, CneaResult, ExposureAge, ExposureHistory, calculate_cnea};
pub use iaf::{IafConfig, IafResult, calculate_iaf};
pub use mcc::{MccConfig, MccResult, calculate_mcc};
pub use pbdr::{ParentBodyType, PbdrConfig, PbdrResult, calculate_pbdr};
pub use smg::{ShockStage, SmgConfig, SmgResult, calculate_smg};
pub use twi::{TwiResult, calculate_twi};
