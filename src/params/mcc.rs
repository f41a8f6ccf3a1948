//! MCC: Mineralogical Classification Coefficient.
//!
//! ```text
//! MCC = clamp(1 - d / d_max, 0, 1)
//! ```
//!
//! where `d` is the Mahalanobis distance from the specimen composition to a
//! group centroid. Stony specimens are compared in (Fa, Fs, Δ¹⁷O) against the
//! chondrite groups; a specimen carrying bulk-metal Ni is treated as an iron and
//! compared in Ni wt% against the iron groups. Without a target group the
//! closest group of the family is assigned (ties keep table order).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DerivedQuantity, MineralComposition, Parameter, ParameterScore};
use crate::error::{AppError, Result};
use crate::math::mahalanobis;
use crate::reference::{GroupFamily, MineralGroup};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MccConfig {
    pub d_max_stony: f64,
    pub d_max_iron: f64,
}

impl Default for MccConfig {
    fn default() -> Self {
        Self {
            d_max_stony: 5.0,
            d_max_iron: 5.0,
        }
    }
}

impl MccConfig {
    pub fn d_max(&self, family: GroupFamily) -> f64 {
        match family {
            GroupFamily::Stony => self.d_max_stony,
            GroupFamily::Iron => self.d_max_iron,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("d_max_stony", self.d_max_stony), ("d_max_iron", self.d_max_iron)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("mcc.{name} must be finite and > 0 (got {v}).")));
            }
        }
        Ok(())
    }
}

/// Qualitative strength of the group match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBand {
    Strong,
    Probable,
    Weak,
    None,
}

impl MatchBand {
    pub fn from_score(mcc: f64) -> Self {
        if mcc >= 0.8 {
            MatchBand::Strong
        } else if mcc >= 0.5 {
            MatchBand::Probable
        } else if mcc > 0.0 {
            MatchBand::Weak
        } else {
            MatchBand::None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchBand::Strong => "strong match",
            MatchBand::Probable => "probable match",
            MatchBand::Weak => "weak match",
            MatchBand::None => "no match",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MccResult {
    pub mcc: f64,
    pub group: MineralGroup,
    pub family: GroupFamily,
    pub distance: f64,
    pub band: MatchBand,
    /// Covariance was singular and the scaled Euclidean fallback was used.
    pub low_confidence: bool,
}

impl MccResult {
    pub fn to_score(&self) -> ParameterScore {
        ParameterScore::new(Parameter::Mcc, self.mcc, format!("{} ({})", self.group, self.band.label()))
            .with_derived(DerivedQuantity::CentroidDistance { value: self.distance })
            .flagged(self.low_confidence)
    }
}

/// Composition vector and family implied by the supplied fields.
fn observation(composition: &MineralComposition) -> Result<(GroupFamily, Vec<f64>)> {
    if let Some(ni) = composition.ni {
        return Ok((GroupFamily::Iron, vec![ni]));
    }
    match (composition.fa, composition.fs, composition.d17o) {
        (Some(fa), Some(fs), Some(d17o)) => Ok((GroupFamily::Stony, vec![fa, fs, d17o])),
        (None, None, None) => Err(AppError::invalid(
            "Mineralogy has neither Ni (iron) nor Fa/Fs/Δ17O (stony).",
        )),
        _ => Err(AppError::invalid(
            "Stony composition needs all of Fa, Fs and Δ17O (got a partial vector).",
        )),
    }
}

/// MCC of `observation` against one group.
pub fn mcc_against(observation: &[f64], group: MineralGroup, config: &MccConfig) -> Result<MccResult> {
    let centroid = group.centroid();
    let distance = mahalanobis(observation, &centroid.mean, &centroid.covariance)?;
    let family = group.family();
    let mcc = (1.0 - distance.value / config.d_max(family)).clamp(0.0, 1.0);
    Ok(MccResult {
        mcc,
        group,
        family,
        distance: distance.value,
        band: MatchBand::from_score(mcc),
        low_confidence: distance.singular,
    })
}

pub fn calculate_mcc(composition: &MineralComposition, config: &MccConfig) -> Result<MccResult> {
    let (family, obs) = observation(composition)?;

    if let Some(target) = composition.target_group {
        if target.family() != family {
            return Err(AppError::invalid(format!(
                "Target group {target} is {:?} but the composition is {:?}.",
                target.family(),
                family
            )));
        }
        return mcc_against(&obs, target, config);
    }

    let mut best: Option<MccResult> = None;
    for group in MineralGroup::of_family(family) {
        let candidate = mcc_against(&obs, group, config)?;
        debug!(group = %group, distance = candidate.distance, "mcc candidate");
        let better = match &best {
            None => true,
            Some(b) => candidate.distance < b.distance,
        };
        if better {
            best = Some(candidate);
        }
    }
    best.ok_or_else(|| AppError::numerical("No reference group available for MCC."))
}
