//! SMG: Shock Metamorphism Grade.
//!
//! Each petrographic indicator (scaled to `[0, 1]`) maps to an equivalent peak
//! pressure through a fixed piecewise calibration. The grade is the weighted
//! mean of those pressures together with any direct pressure estimates:
//!
//! ```text
//! SMG = Σ wᵢ·fᵢ / Σ wᵢ          (GPa-equivalent)
//! ```
//!
//! The post-shock temperature follows from a linear Hugoniot
//! `U_s = C₀ + s·u_p`: solving `P = ρ₀·U_s·u_p` for `u_p` gives the relative
//! compression `ΔV/V₀ = u_p / U_s`, and the waste heat is
//! `T_post = T₀ + P·(ΔV/V₀) / (2·c_v·ρ₀)`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DerivedQuantity, Parameter, ParameterScore, ShockIndicators};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmgConfig {
    /// Weight of the mean direct pressure estimate relative to the indicators.
    pub direct_estimate_weight: f64,
    pub initial_temperature_k: f64,
    /// Target density ρ₀ (kg/m³).
    pub density: f64,
    /// Specific heat c_v (J/kg·K).
    pub heat_capacity: f64,
    /// Hugoniot intercept C₀ (m/s).
    pub bulk_sound_speed: f64,
    /// Hugoniot slope s.
    pub hugoniot_slope: f64,
}

impl Default for SmgConfig {
    fn default() -> Self {
        Self {
            direct_estimate_weight: 0.30,
            initial_temperature_k: 293.0,
            density: 3300.0,
            heat_capacity: 1000.0,
            bulk_sound_speed: 5000.0,
            hugoniot_slope: 1.3,
        }
    }
}

impl SmgConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("direct_estimate_weight", self.direct_estimate_weight),
            ("initial_temperature_k", self.initial_temperature_k),
            ("density", self.density),
            ("heat_capacity", self.heat_capacity),
            ("bulk_sound_speed", self.bulk_sound_speed),
            ("hugoniot_slope", self.hugoniot_slope),
        ];
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("smg.{name} must be finite and > 0 (got {v}).")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShockIndicator {
    OlivinePlanar,
    FeldsparState,
    MetalMelting,
    HighPressurePhases,
    SulfideState,
    Porosity,
}

impl ShockIndicator {
    pub const ALL: [ShockIndicator; 6] = [
        ShockIndicator::OlivinePlanar,
        ShockIndicator::FeldsparState,
        ShockIndicator::MetalMelting,
        ShockIndicator::HighPressurePhases,
        ShockIndicator::SulfideState,
        ShockIndicator::Porosity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShockIndicator::OlivinePlanar => "olivine_planar",
            ShockIndicator::FeldsparState => "feldspar_state",
            ShockIndicator::MetalMelting => "metal_melting",
            ShockIndicator::HighPressurePhases => "high_pressure_phases",
            ShockIndicator::SulfideState => "sulfide_state",
            ShockIndicator::Porosity => "porosity",
        }
    }

    pub fn weight(self) -> f64 {
        match self {
            ShockIndicator::OlivinePlanar => 0.28,
            ShockIndicator::FeldsparState => 0.24,
            ShockIndicator::MetalMelting => 0.18,
            ShockIndicator::HighPressurePhases => 0.16,
            ShockIndicator::SulfideState => 0.09,
            ShockIndicator::Porosity => 0.05,
        }
    }

    fn value(self, indicators: &ShockIndicators) -> Option<f64> {
        match self {
            ShockIndicator::OlivinePlanar => indicators.olivine_planar,
            ShockIndicator::FeldsparState => indicators.feldspar_state,
            ShockIndicator::MetalMelting => indicators.metal_melting,
            ShockIndicator::HighPressurePhases => indicators.high_pressure_phases,
            ShockIndicator::SulfideState => indicators.sulfide_state,
            ShockIndicator::Porosity => indicators.porosity,
        }
    }

    /// Equivalent peak pressure (GPa) for an indicator value in `[0, 1]`.
    pub fn pressure_gpa(self, v: f64) -> f64 {
        match self {
            ShockIndicator::OlivinePlanar => {
                if v < 0.1 {
                    4.0
                } else if v < 0.25 {
                    8.0
                } else if v < 0.45 {
                    15.0
                } else if v < 0.65 {
                    28.0
                } else if v < 0.85 {
                    45.0
                } else {
                    70.0
                }
            }
            ShockIndicator::FeldsparState => {
                if v < 0.2 {
                    4.0
                } else if v < 0.4 {
                    12.0
                } else if v < 0.6 {
                    25.0
                } else if v < 0.8 {
                    40.0
                } else {
                    65.0
                }
            }
            ShockIndicator::MetalMelting => 8.0 + 55.0 * v,
            ShockIndicator::HighPressurePhases => {
                if v < 0.1 {
                    0.0
                } else if v < 0.3 {
                    22.0
                } else if v < 0.6 {
                    38.0
                } else {
                    58.0
                }
            }
            ShockIndicator::SulfideState => 4.0 + 38.0 * v,
            // Porosity is destroyed by compaction: less remaining porosity, more pressure.
            ShockIndicator::Porosity => 2.0 + (1.0 - v) * 48.0,
        }
    }
}

/// Stöffler shock stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShockStage {
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
}

impl ShockStage {
    pub fn from_pressure(gpa: f64) -> Self {
        if gpa < 5.0 {
            ShockStage::S1
        } else if gpa < 10.0 {
            ShockStage::S2
        } else if gpa < 20.0 {
            ShockStage::S3
        } else if gpa < 35.0 {
            ShockStage::S4
        } else if gpa < 55.0 {
            ShockStage::S5
        } else {
            ShockStage::S6
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShockStage::S1 => "S1",
            ShockStage::S2 => "S2",
            ShockStage::S3 => "S3",
            ShockStage::S4 => "S4",
            ShockStage::S5 => "S5",
            ShockStage::S6 => "S6",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ShockStage::S1 => "unshocked",
            ShockStage::S2 => "very weakly shocked",
            ShockStage::S3 => "weakly shocked",
            ShockStage::S4 => "moderately shocked",
            ShockStage::S5 => "strongly shocked",
            ShockStage::S6 => "very strongly shocked",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmgResult {
    pub pressure_gpa: f64,
    pub stage: ShockStage,
    pub post_shock_temperature_k: f64,
    pub indicators_used: usize,
    pub low_confidence: bool,
}

impl SmgResult {
    pub fn to_score(&self) -> ParameterScore {
        ParameterScore::new(Parameter::Smg, self.pressure_gpa, self.stage.label())
            .with_derived(DerivedQuantity::PostShockTemperature {
                kelvin: self.post_shock_temperature_k,
            })
            .flagged(self.low_confidence)
    }
}

/// Relative compression `ΔV/V₀ = u_p / U_s` at peak pressure `pressure_pa`.
pub fn hugoniot_compression(pressure_pa: f64, config: &SmgConfig) -> f64 {
    if pressure_pa <= 0.0 {
        return 0.0;
    }
    let c0 = config.bulk_sound_speed;
    let s = config.hugoniot_slope;
    let up = (-c0 + (c0 * c0 + 4.0 * s * pressure_pa / config.density).sqrt()) / (2.0 * s);
    up / (c0 + s * up)
}

pub fn post_shock_temperature(pressure_gpa: f64, config: &SmgConfig) -> f64 {
    let p = pressure_gpa * 1.0e9;
    let compression = hugoniot_compression(p, config);
    config.initial_temperature_k + p * compression / (2.0 * config.heat_capacity * config.density)
}

pub fn calculate_smg(indicators: &ShockIndicators, config: &SmgConfig) -> Result<SmgResult> {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    let mut used = 0;

    for indicator in ShockIndicator::ALL {
        let Some(v) = indicator.value(indicators) else {
            continue;
        };
        if !(v.is_finite() && (0.0..=1.0).contains(&v)) {
            return Err(AppError::invalid(format!(
                "Shock indicator {} must be in [0, 1] (got {v}).",
                indicator.name()
            )));
        }
        weighted += indicator.weight() * indicator.pressure_gpa(v);
        weight_sum += indicator.weight();
        used += 1;
    }

    let estimates = &indicators.pressure_estimates_gpa;
    if let Some(bad) = estimates.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
        return Err(AppError::invalid(format!(
            "Peak pressure estimate must be finite and >= 0 (got {bad})."
        )));
    }
    if !estimates.is_empty() {
        let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
        weighted += config.direct_estimate_weight * mean;
        weight_sum += config.direct_estimate_weight;
    }

    if weight_sum <= 0.0 {
        return Err(AppError::invalid("No shock indicator or pressure estimate supplied."));
    }

    let pressure_gpa = weighted / weight_sum;
    let stage = ShockStage::from_pressure(pressure_gpa);
    let post_shock_temperature_k = post_shock_temperature(pressure_gpa, config);
    debug!(pressure_gpa, stage = stage.label(), indicators = used, "smg");

    Ok(SmgResult {
        pressure_gpa,
        stage,
        post_shock_temperature_k,
        indicators_used: used,
        low_confidence: used < ShockIndicator::ALL.len() && estimates.is_empty(),
    })
}
