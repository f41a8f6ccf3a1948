//! EMI configuration: weights, normalization bounds, level thresholds and the
//! per-calculator tables.
//!
//! Resolution order for the config file:
//! 1. `--config <path>`
//! 2. `METEORICA_CONFIG` (a `.env` file is loaded by the binary first)
//! 3. compiled defaults
//!
//! Every key in the TOML document is optional. `[weights]` and `[bounds.*]`
//! entries overlay the defaults parameter by parameter; the merged config is
//! validated before use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::domain::{ClassificationLevel, Parameter, PerParameter};
use crate::error::{AppError, Result};
use crate::params::{AtpConfig, CneaConfig, IafConfig, MccConfig, PbdrConfig, SmgConfig};

pub const CONFIG_ENV_VAR: &str = "METEORICA_CONFIG";

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Normalization bounds: `min` maps to 0 and `critical` to 1.
///
/// `critical < min` inverts the axis, used for "goodness" scores (MCC, IAF).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub critical: f64,
}

impl Bounds {
    pub const fn new(min: f64, critical: f64) -> Self {
        Self { min, critical }
    }
}

pub fn default_weights() -> PerParameter<f64> {
    PerParameter {
        mcc: 0.26,
        smg: 0.19,
        twi: 0.18,
        iaf: 0.17,
        atp: 0.10,
        pbdr: 0.06,
        cnea: 0.04,
    }
}

pub fn default_bounds() -> PerParameter<Bounds> {
    PerParameter {
        mcc: Bounds::new(1.0, 0.0),
        smg: Bounds::new(0.0, 55.0),
        twi: Bounds::new(0.0, 1.0),
        iaf: Bounds::new(1.0, 0.0),
        atp: Bounds::new(0.0, 6000.0),
        pbdr: Bounds::new(0.0, 1.0),
        cnea: Bounds::new(0.0, 100.0),
    }
}

/// Lower edges of the classification levels above `Unambiguous`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub high_confidence: f64,
    pub boundary: f64,
    pub anomalous: f64,
    pub ungrouped: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high_confidence: 0.20,
            boundary: 0.40,
            anomalous: 0.60,
            ungrouped: 0.80,
        }
    }
}

impl LevelThresholds {
    pub fn level_for(&self, emi: f64) -> ClassificationLevel {
        if emi < self.high_confidence {
            ClassificationLevel::Unambiguous
        } else if emi < self.boundary {
            ClassificationLevel::HighConfidence
        } else if emi < self.anomalous {
            ClassificationLevel::BoundaryZone
        } else if emi < self.ungrouped {
            ClassificationLevel::Anomalous
        } else {
            ClassificationLevel::UngroupedCandidate
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = [self.high_confidence, self.boundary, self.anomalous, self.ungrouped];
        if t.iter().any(|v| !(v.is_finite() && *v > 0.0 && *v < 1.0)) {
            return Err(AppError::config(format!("Thresholds must lie in (0, 1): {t:?}.")));
        }
        if !t.windows(2).all(|w| w[0] < w[1]) {
            return Err(AppError::config(format!("Thresholds must be strictly increasing: {t:?}.")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmiConfig {
    #[serde(deserialize_with = "weight_overrides")]
    pub weights: PerParameter<f64>,
    #[serde(deserialize_with = "bounds_overrides")]
    pub bounds: PerParameter<Bounds>,
    pub thresholds: LevelThresholds,
    pub mcc: MccConfig,
    pub smg: SmgConfig,
    pub iaf: IafConfig,
    pub atp: AtpConfig,
    pub pbdr: PbdrConfig,
    pub cnea: CneaConfig,
}

impl Default for EmiConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            bounds: default_bounds(),
            thresholds: LevelThresholds::default(),
            mcc: MccConfig::default(),
            smg: SmgConfig::default(),
            iaf: IafConfig::default(),
            atp: AtpConfig::default(),
            pbdr: PbdrConfig::default(),
            cnea: CneaConfig::default(),
        }
    }
}

fn weight_overrides<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PerParameter<f64>, D::Error> {
    let overrides = BTreeMap::<Parameter, f64>::deserialize(d)?;
    let mut weights = default_weights();
    for (p, w) in overrides {
        *weights.get_mut(p) = w;
    }
    Ok(weights)
}

fn bounds_overrides<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<PerParameter<Bounds>, D::Error> {
    let overrides = BTreeMap::<Parameter, Bounds>::deserialize(d)?;
    let mut bounds = default_bounds();
    for (p, b) in overrides {
        *bounds.get_mut(p) = b;
    }
    Ok(bounds)
}

impl EmiConfig {
    pub fn validate(&self) -> Result<()> {
        let mut sum = 0.0;
        for (p, w) in self.weights.iter() {
            if !(w.is_finite() && *w >= 0.0) {
                return Err(AppError::config(format!(
                    "Weight for {} must be finite and >= 0 (got {w}).",
                    p.display_name()
                )));
            }
            sum += w;
        }
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AppError::config(format!("Weights must sum to 1.0 (got {sum:.6}).")));
        }

        for (p, b) in self.bounds.iter() {
            if !(b.min.is_finite() && b.critical.is_finite()) || b.min == b.critical {
                return Err(AppError::config(format!(
                    "Bounds for {} must be finite with min != critical (got {} / {}).",
                    p.display_name(),
                    b.min,
                    b.critical
                )));
            }
        }

        self.thresholds.validate()?;
        self.mcc.validate()?;
        self.smg.validate()?;
        self.iaf.validate()?;
        self.atp.validate()?;
        self.pbdr.validate()?;
        self.cnea.validate()?;
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EmiConfig =
            toml::from_str(text).map_err(|e| AppError::config(format!("Invalid config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read config {}: {e}", path.display())))?;
        Self::from_toml_str(&text).map_err(|e| e.with_context(path.display()))
    }

    /// Load from `cli_path`, then `METEORICA_CONFIG`, else defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let path = match cli_path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };
        match path {
            Some(p) => {
                info!(path = %p.display(), "loading config");
                Self::load(&p)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::config(format!("Failed to render config: {e}")))
    }
}
