//! IAF: Isotopic Anomaly Fingerprint.
//!
//! ```text
//! IAF_g = exp(-d_g² / (2·σ_g²))
//! ```
//!
//! with `d_g` the Euclidean distance in 7-D ε-space to group `g`. The best
//! scoring group is assigned; a best score under the configured floor marks the
//! specimen as a presolar-grain or ungrouped candidate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DerivedQuantity, IsotopeVector, Parameter, ParameterScore};
use crate::error::{AppError, Result};
use crate::math::euclidean;
use crate::reference::IsotopicGroup;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IafConfig {
    pub outlier_floor: f64,
}

impl Default for IafConfig {
    fn default() -> Self {
        Self { outlier_floor: 0.3 }
    }
}

impl IafConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.outlier_floor.is_finite() && (0.0..1.0).contains(&self.outlier_floor)) {
            return Err(AppError::config(format!(
                "iaf.outlier_floor must be in [0, 1) (got {}).",
                self.outlier_floor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IafResult {
    pub iaf: f64,
    pub group: IsotopicGroup,
    pub distance: f64,
    pub presolar_candidate: bool,
    /// Score against every reference group, in table order.
    pub group_scores: Vec<(IsotopicGroup, f64)>,
}

impl IafResult {
    pub fn to_score(&self) -> ParameterScore {
        let grade = if self.presolar_candidate {
            format!("{} (presolar/ungrouped candidate)", self.group)
        } else {
            self.group.to_string()
        };
        ParameterScore::new(Parameter::Iaf, self.iaf, grade)
            .with_derived(DerivedQuantity::IsotopicDistance { value: self.distance })
    }
}

/// ε notation: deviation of a ratio from its standard in parts per 10⁴.
pub fn epsilon(ratio: f64, standard: f64) -> Result<f64> {
    if !(standard.is_finite() && standard > 0.0) {
        return Err(AppError::invalid(format!("Standard ratio must be finite and > 0 (got {standard}).")));
    }
    if !ratio.is_finite() {
        return Err(AppError::invalid("Isotope ratio is not finite."));
    }
    Ok((ratio / standard - 1.0) * 1.0e4)
}

pub fn calculate_iaf(isotopes: &IsotopeVector, config: &IafConfig) -> Result<IafResult> {
    let obs = isotopes.to_array();
    if let Some(i) = obs.iter().position(|v| !v.is_finite()) {
        return Err(AppError::invalid(format!("{} is not finite.", IsotopeVector::NAMES[i])));
    }

    let mut group_scores = Vec::with_capacity(IsotopicGroup::ALL.len());
    let mut best: Option<(IsotopicGroup, f64, f64)> = None;
    for group in IsotopicGroup::ALL {
        let centroid = group.centroid();
        let d = euclidean(&obs, &centroid.mean)?;
        let score = (-(d * d) / (2.0 * centroid.sigma * centroid.sigma)).exp();
        group_scores.push((group, score));
        if best.is_none_or(|(_, s, _)| score > s) {
            best = Some((group, score, d));
        }
    }

    let (group, iaf, distance) =
        best.ok_or_else(|| AppError::numerical("No isotopic reference group available."))?;
    debug!(group = %group, iaf, distance, "iaf");
    Ok(IafResult {
        iaf,
        group,
        distance,
        presolar_candidate: iaf < config.outlier_floor,
        group_scores,
    })
}
