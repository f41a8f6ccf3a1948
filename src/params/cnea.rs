//! CNEA: Cosmogenic Nuclide Exposure Age.
//!
//! Production of each nuclide at shielding depth `d` is
//!
//! ```text
//! P(d) = P₀·exp(-d·ρ/Λ)
//! ```
//!
//! A stable nuclide accumulates linearly (`N = P·T`); a radioactive one
//! approaches saturation (`N = P/λ·(1 - e^{-λT})`). With several nuclides the
//! exposure age and shielding depth are solved jointly by minimising
//!
//! ```text
//! χ²(T, d) = Σ ((N_i - N_i^model(T, d)) / σ_i)²,   σ_i = r_i·N_i
//! ```
//!
//! over a depth grid (evaluated in parallel) and a log-spaced age grid refined
//! by golden-section search. When a stable nuclide pins the minimum to the top
//! of the age grid, the grid is doubled and the solve repeated. Apparent ages that disagree with the joint age by
//! more than the concordance threshold indicate a multi-stage history.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DerivedQuantity, NuclideData, Parameter, ParameterScore};
use crate::error::{AppError, Result};
use crate::math::{golden_section_min, linspace, log_space};
use crate::reference::Nuclide;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CneaConfig {
    /// Fraction of the saturation concentration above which a radioactive
    /// nuclide only bounds the age from below.
    pub saturation_fraction: f64,
    /// Concordance threshold in units of σ.
    pub concordance_sigma: f64,
    pub min_age_ma: f64,
    pub max_age_ma: f64,
    pub age_grid_steps: usize,
    pub max_depth_cm: f64,
    pub depth_steps: usize,
    /// Bulk density of the meteoroid (g/cm³).
    pub density: f64,
}

impl Default for CneaConfig {
    fn default() -> Self {
        Self {
            saturation_fraction: 0.99,
            concordance_sigma: 2.0,
            min_age_ma: 0.001,
            max_age_ma: 3000.0,
            age_grid_steps: 200,
            max_depth_cm: 150.0,
            depth_steps: 151,
            density: 3.3,
        }
    }
}

impl CneaConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.saturation_fraction > 0.0 && self.saturation_fraction < 1.0) {
            return Err(AppError::config(format!(
                "cnea.saturation_fraction must be in (0, 1) (got {}).",
                self.saturation_fraction
            )));
        }
        let checks = [
            ("concordance_sigma", self.concordance_sigma),
            ("min_age_ma", self.min_age_ma),
            ("max_age_ma", self.max_age_ma),
            ("density", self.density),
        ];
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("cnea.{name} must be finite and > 0 (got {v}).")));
            }
        }
        if self.max_age_ma <= self.min_age_ma {
            return Err(AppError::config("cnea.max_age_ma must exceed cnea.min_age_ma."));
        }
        if !(self.max_depth_cm.is_finite() && self.max_depth_cm >= 0.0) {
            return Err(AppError::config("cnea.max_depth_cm must be finite and >= 0."));
        }
        if self.age_grid_steps < 3 || self.depth_steps == 0 {
            return Err(AppError::config("cnea.age_grid_steps must be >= 3 and cnea.depth_steps >= 1."));
        }
        Ok(())
    }
}

/// Age implied by a single nuclide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApparentAge {
    Finite { age_ma: f64, sigma_ma: f64 },
    /// Radioactive nuclide at or above the saturation threshold.
    Saturated { lower_bound_ma: f64 },
}

impl ApparentAge {
    pub fn finite(&self) -> Option<f64> {
        match *self {
            ApparentAge::Finite { age_ma, .. } => Some(age_ma),
            ApparentAge::Saturated { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExposureAge {
    Finite { age_ma: f64 },
    AtOrAboveSaturation { lower_bound_ma: f64 },
}

impl ExposureAge {
    /// Age used as the raw score: the lower bound when saturated.
    pub fn value_ma(&self) -> f64 {
        match *self {
            ExposureAge::Finite { age_ma } => age_ma,
            ExposureAge::AtOrAboveSaturation { lower_bound_ma } => lower_bound_ma,
        }
    }

    pub fn is_saturated(&self) -> bool {
        matches!(self, ExposureAge::AtOrAboveSaturation { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExposureHistory {
    SingleStage,
    MultiStage { stages: u8 },
}

impl ExposureHistory {
    pub fn label(&self) -> String {
        match self {
            ExposureHistory::SingleStage => "single-stage".to_string(),
            ExposureHistory::MultiStage { stages } => format!("multi-stage ({stages})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NuclideAge {
    pub nuclide: Nuclide,
    pub concentration: f64,
    pub age: ApparentAge,
    /// |T_i - T| in units of the nuclide's σ; None without a joint age.
    pub deviation_sigma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CneaResult {
    pub exposure_age: ExposureAge,
    pub sigma_ma: Option<f64>,
    pub shielding_depth_cm: f64,
    pub nuclides: Vec<NuclideAge>,
    pub history: ExposureHistory,
    pub concordant: bool,
    /// Minimum χ² of the joint solve (None for a single nuclide).
    pub chi_square: Option<f64>,
}

impl CneaResult {
    pub fn to_score(&self) -> ParameterScore {
        let saturated = self.exposure_age.is_saturated();
        let grade = if saturated {
            format!("≥ saturation, {}", self.history.label())
        } else {
            self.history.label()
        };
        ParameterScore::new(Parameter::Cnea, self.exposure_age.value_ma(), grade)
            .with_derived(DerivedQuantity::ExposureAge {
                ma: self.exposure_age.value_ma(),
                saturated,
            })
            .flagged(saturated)
    }
}

pub fn production_rate(nuclide: Nuclide, depth_cm: f64, density: f64) -> f64 {
    nuclide.production_rate() * (-depth_cm * density / nuclide.attenuation_length()).exp()
}

/// Expected concentration after `age_ma` of exposure at `depth_cm`.
pub fn model_concentration(nuclide: Nuclide, age_ma: f64, depth_cm: f64, density: f64) -> f64 {
    let p = production_rate(nuclide, depth_cm, density);
    match nuclide.decay_constant() {
        Some(lambda) => p / lambda * (1.0 - (-lambda * age_ma).exp()),
        None => p * age_ma,
    }
}

pub fn apparent_age(nuclide: Nuclide, concentration: f64, depth_cm: f64, config: &CneaConfig) -> ApparentAge {
    let p = production_rate(nuclide, depth_cm, config.density);
    let rel = nuclide.relative_uncertainty();
    match nuclide.decay_constant() {
        None => {
            let age_ma = concentration / p;
            ApparentAge::Finite {
                age_ma,
                sigma_ma: rel * age_ma,
            }
        }
        Some(lambda) => {
            let saturation = p / lambda;
            let fraction = concentration / saturation;
            if fraction >= config.saturation_fraction {
                ApparentAge::Saturated {
                    lower_bound_ma: -(1.0 - config.saturation_fraction).ln() / lambda,
                }
            } else {
                let age_ma = -(1.0 - fraction).ln() / lambda;
                ApparentAge::Finite {
                    age_ma,
                    sigma_ma: rel * age_ma,
                }
            }
        }
    }
}

const MAX_GRID_WIDENINGS: u32 = 16;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    depth_cm: f64,
    age_ma: f64,
    chi2: f64,
}

fn chi_square(obs: &[(Nuclide, f64)], age_ma: f64, depth_cm: f64, density: f64) -> f64 {
    obs.iter()
        .map(|&(n, c)| {
            let sigma = n.relative_uncertainty() * c;
            let r = (c - model_concentration(n, age_ma, depth_cm, density)) / sigma;
            r * r
        })
        .sum()
}

fn best_age_at_depth(obs: &[(Nuclide, f64)], depth_cm: f64, ages: &[f64], density: f64) -> (f64, f64) {
    let mut best_i = 0;
    let mut best_chi2 = f64::INFINITY;
    for (i, &t) in ages.iter().enumerate() {
        let chi2 = chi_square(obs, t, depth_cm, density);
        if chi2 < best_chi2 {
            best_chi2 = chi2;
            best_i = i;
        }
    }
    let lo = ages[best_i.saturating_sub(1)];
    let hi = ages[(best_i + 1).min(ages.len() - 1)];
    let (age, chi2) = golden_section_min(|t| chi_square(obs, t, depth_cm, density), lo, hi, 1e-9 * hi, 200);
    if chi2 <= best_chi2 { (age, chi2) } else { (ages[best_i], best_chi2) }
}

/// Joint (age, depth) solve; the depth is fixed when `fixed_depth` is given.
///
/// Stable nuclides grow without bound, so a minimum in the last age interval
/// means the grid is too short: it is doubled up to `MAX_GRID_WIDENINGS` times.
/// Radioactive-only sets legitimately flatten out at saturation and are taken
/// as found.
fn joint_solve(obs: &[(Nuclide, f64)], fixed_depth: Option<f64>, config: &CneaConfig) -> Result<Candidate> {
    let depths = match fixed_depth {
        Some(d) => vec![d],
        None => linspace(0.0, config.max_depth_cm, config.depth_steps)?,
    };
    let unbounded = obs.iter().any(|(n, _)| !n.is_radioactive());

    let mut max_age_ma = config.max_age_ma;
    for _ in 0..=MAX_GRID_WIDENINGS {
        let ages = log_space(config.min_age_ma, max_age_ma, config.age_grid_steps)?;
        let best = solve_on_grid(obs, &depths, &ages, config.density)?;
        let edge = ages[ages.len() - 2];
        if !unbounded || best.age_ma <= edge {
            return Ok(best);
        }
        debug!(max_age_ma, age_ma = best.age_ma, "cnea minimum at age-grid edge, widening");
        max_age_ma *= 2.0;
    }
    Err(AppError::numerical(format!(
        "Exposure-age joint solve found no minimum below {max_age_ma} Ma."
    )))
}

fn solve_on_grid(obs: &[(Nuclide, f64)], depths: &[f64], ages: &[f64], density: f64) -> Result<Candidate> {
    let candidates: Vec<Candidate> = depths
        .par_iter()
        .enumerate()
        .map(|(idx, &depth_cm)| {
            let (age_ma, chi2) = best_age_at_depth(obs, depth_cm, ages, density);
            Candidate {
                idx,
                depth_cm,
                age_ma,
                chi2,
            }
        })
        .filter(|c| c.chi2.is_finite())
        .collect();

    let mut best: Option<Candidate> = None;
    for c in candidates {
        let better = match best {
            None => true,
            Some(b) => c.chi2 < b.chi2 || (c.chi2 == b.chi2 && c.idx < b.idx),
        };
        if better {
            best = Some(c);
        }
    }
    best.ok_or_else(|| AppError::numerical("Exposure-age joint solve found no finite χ² minimum."))
}

fn deviation(age: &ApparentAge, joint_ma: f64) -> f64 {
    match *age {
        ApparentAge::Finite { age_ma, sigma_ma } => {
            if sigma_ma > 0.0 {
                (age_ma - joint_ma).abs() / sigma_ma
            } else {
                0.0
            }
        }
        ApparentAge::Saturated { lower_bound_ma } => (lower_bound_ma - joint_ma).max(0.0) / (0.2 * lower_bound_ma),
    }
}

fn history_from_spread(ages: &[f64]) -> ExposureHistory {
    let min = ages.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ages.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = ages.iter().sum::<f64>() / ages.len().max(1) as f64;
    let stages = if mean > 0.0 && (max - min) / mean > 0.5 { 3 } else { 2 };
    ExposureHistory::MultiStage { stages }
}

pub fn calculate_cnea(data: &NuclideData, config: &CneaConfig) -> Result<CneaResult> {
    if data.concentrations.is_empty() {
        return Err(AppError::invalid("No cosmogenic nuclide concentration supplied."));
    }
    for (nuclide, c) in &data.concentrations {
        if !(c.is_finite() && *c > 0.0) {
            return Err(AppError::invalid(format!(
                "Concentration of {nuclide} must be finite and > 0 (got {c})."
            )));
        }
    }
    if let Some(d) = data.shielding_depth_cm {
        if !(d.is_finite() && d >= 0.0) {
            return Err(AppError::invalid(format!("Shielding depth must be finite and >= 0 (got {d}).")));
        }
    }

    let obs: Vec<(Nuclide, f64)> = data.concentrations.iter().map(|(n, c)| (*n, *c)).collect();

    if let [(nuclide, concentration)] = obs.as_slice() {
        let (nuclide, concentration) = (*nuclide, *concentration);
        let depth = data.shielding_depth_cm.unwrap_or(0.0);
        let age = apparent_age(nuclide, concentration, depth, config);
        let (exposure_age, sigma_ma) = match age {
            ApparentAge::Finite { age_ma, sigma_ma } => (ExposureAge::Finite { age_ma }, Some(sigma_ma)),
            ApparentAge::Saturated { lower_bound_ma } => (ExposureAge::AtOrAboveSaturation { lower_bound_ma }, None),
        };
        return Ok(CneaResult {
            exposure_age,
            sigma_ma,
            shielding_depth_cm: depth,
            nuclides: vec![NuclideAge {
                nuclide,
                concentration,
                age,
                deviation_sigma: None,
            }],
            history: ExposureHistory::SingleStage,
            concordant: true,
            chi_square: None,
        });
    }

    let best = joint_solve(&obs, data.shielding_depth_cm, config)?;
    debug!(age_ma = best.age_ma, depth_cm = best.depth_cm, chi2 = best.chi2, "cnea joint solve");

    let mut nuclides: Vec<NuclideAge> = obs
        .iter()
        .map(|&(nuclide, concentration)| NuclideAge {
            nuclide,
            concentration,
            age: apparent_age(nuclide, concentration, best.depth_cm, config),
            deviation_sigma: None,
        })
        .collect();

    let finite: Vec<f64> = nuclides.iter().filter_map(|n| n.age.finite()).collect();
    if finite.is_empty() {
        let lower_bound_ma = nuclides
            .iter()
            .filter_map(|n| match n.age {
                ApparentAge::Saturated { lower_bound_ma } => Some(lower_bound_ma),
                ApparentAge::Finite { .. } => None,
            })
            .fold(0.0, f64::max);
        return Ok(CneaResult {
            exposure_age: ExposureAge::AtOrAboveSaturation { lower_bound_ma },
            sigma_ma: None,
            shielding_depth_cm: best.depth_cm,
            nuclides,
            history: ExposureHistory::SingleStage,
            concordant: true,
            chi_square: Some(best.chi2),
        });
    }

    let mut concordant = true;
    for n in &mut nuclides {
        let dev = deviation(&n.age, best.age_ma);
        if dev > config.concordance_sigma {
            concordant = false;
        }
        n.deviation_sigma = Some(dev);
    }

    // Inverse-variance combination of the finite apparent ages.
    let inv_var: f64 = nuclides
        .iter()
        .filter_map(|n| match n.age {
            ApparentAge::Finite { sigma_ma, .. } if sigma_ma > 0.0 => Some(1.0 / (sigma_ma * sigma_ma)),
            _ => None,
        })
        .sum();
    let sigma_ma = (inv_var > 0.0).then(|| 1.0 / inv_var.sqrt());

    let history = if concordant {
        ExposureHistory::SingleStage
    } else {
        history_from_spread(&finite)
    };

    Ok(CneaResult {
        exposure_age: ExposureAge::Finite { age_ma: best.age_ma },
        sigma_ma,
        shielding_depth_cm: best.depth_cm,
        nuclides,
        history,
        concordant,
        chi_square: Some(best.chi2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(Nuclide, f64)], depth: Option<f64>) -> NuclideData {
        NuclideData {
            concentrations: pairs.iter().copied().collect(),
            shielding_depth_cm: depth,
        }
    }

    #[test]
    fn single_stable_nuclide_at_twice_production() {
        let r = calculate_cnea(&data(&[(Nuclide::He3, 3.0)], None), &CneaConfig::default()).unwrap();
        assert_eq!(r.exposure_age, ExposureAge::Finite { age_ma: 2.0 });
        assert_eq!(r.history, ExposureHistory::SingleStage);
        assert!((r.sigma_ma.unwrap() - 0.16).abs() < 1e-12);
    }

    #[test]
    fn concordant_pair_recovers_age_and_surface_depth() {
        let r = calculate_cnea(
            &data(&[(Nuclide::He3, 30.0), (Nuclide::Ne21, 7.0)], None),
            &CneaConfig::default(),
        )
        .unwrap();
        let age = r.exposure_age.value_ma();
        assert!((age - 20.0).abs() < 0.05, "age={age}");
        assert_eq!(r.shielding_depth_cm, 0.0);
        assert!(r.concordant);
        assert_eq!(r.history, ExposureHistory::SingleStage);
        assert!(r.chi_square.unwrap() < 1e-6);
    }

    #[test]
    fn discordant_pair_is_multi_stage() {
        let r = calculate_cnea(
            &data(&[(Nuclide::He3, 30.0), (Nuclide::Ne21, 14.0)], Some(0.0)),
            &CneaConfig::default(),
        )
        .unwrap();
        let age = r.exposure_age.value_ma();
        assert!(age > 20.0 && age < 40.0, "age={age}");
        assert!(!r.concordant);
        assert!(matches!(r.history, ExposureHistory::MultiStage { .. }));
    }

    #[test]
    fn old_concordant_pair_is_not_clipped_by_the_age_grid() {
        let r = calculate_cnea(
            &data(&[(Nuclide::He3, 1200.0), (Nuclide::Ne21, 280.0)], Some(0.0)),
            &CneaConfig::default(),
        )
        .unwrap();
        let age = r.exposure_age.value_ma();
        assert!((age - 800.0).abs() < 1.0, "age={age}");
        assert!(r.concordant);
        assert_eq!(r.history, ExposureHistory::SingleStage);
    }

    #[test]
    fn short_age_grid_is_widened() {
        let cfg = CneaConfig {
            max_age_ma: 10.0,
            ..CneaConfig::default()
        };
        let r = calculate_cnea(&data(&[(Nuclide::He3, 1200.0), (Nuclide::Ne21, 280.0)], Some(0.0)), &cfg).unwrap();
        let age = r.exposure_age.value_ma();
        assert!((age - 800.0).abs() < 1.0, "age={age}");
        assert!(r.concordant);
    }

    #[test]
    fn age_beyond_every_widening_is_numerical() {
        let err = calculate_cnea(
            &data(&[(Nuclide::He3, 1.0e9), (Nuclide::Ne21, 1.0e8)], Some(0.0)),
            &CneaConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Numerical(_)), "{err:?}");
    }

    #[test]
    fn radioactive_nuclide_below_saturation() {
        let r = calculate_cnea(&data(&[(Nuclide::Be10, 0.05)], None), &CneaConfig::default()).unwrap();
        let expected = -(1.0 - 0.05 / (0.05 / Nuclide::Be10.decay_constant().unwrap())).ln()
            / Nuclide::Be10.decay_constant().unwrap();
        assert!((r.exposure_age.value_ma() - expected).abs() < 1e-12);
        assert!((expected - 1.386).abs() < 0.01);
    }

    #[test]
    fn saturated_nuclide_reports_lower_bound() {
        let r = calculate_cnea(&data(&[(Nuclide::Be10, 0.1)], None), &CneaConfig::default()).unwrap();
        let ExposureAge::AtOrAboveSaturation { lower_bound_ma } = r.exposure_age else {
            panic!("expected saturation, got {:?}", r.exposure_age);
        };
        assert!(lower_bound_ma.is_finite() && lower_bound_ma > 0.0);
        assert!(r.to_score().low_confidence);
    }

    #[test]
    fn shielding_reduces_production() {
        let surface = production_rate(Nuclide::Ne21, 0.0, 3.3);
        let deep = production_rate(Nuclide::Ne21, 100.0, 3.3);
        assert!(deep < surface);
        assert!((surface - 0.35).abs() < 1e-12);
    }

    #[test]
    fn non_positive_concentration_is_invalid() {
        let cfg = CneaConfig::default();
        assert!(matches!(
            calculate_cnea(&data(&[(Nuclide::Ne21, 0.0)], None), &cfg),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(calculate_cnea(&data(&[], None), &cfg), Err(AppError::InvalidInput(_))));
    }
}
