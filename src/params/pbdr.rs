//! PBDR: Parent Body Differentiation Ratio.
//!
//! ```text
//! PBDR = 1 - mean_i(C_obs,i / C_CI,i)
//! ```
//!
//! Chondritic material keeps CI-like HSE abundances (PBDR ≈ 0). Silicate
//! residues of core formation are depleted (PBDR → 1) and core material is
//! enriched (PBDR < 0). Irons with a Widmanstätten pattern additionally yield
//! a parent-body radius through the metallographic cooling rate.

use serde::{Deserialize, Serialize};

use crate::domain::{DerivedQuantity, Parameter, ParameterScore, SiderophileData};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PbdrConfig {
    /// Cooling-rate coefficient `A` in `CR = A·bw⁻²` (K/Myr·mm²).
    pub cooling_rate_coefficient: f64,
    /// Temperature interval of Widmanstätten growth (K).
    pub cooling_interval_k: f64,
    /// Thermal diffusivity κ (m²/s).
    pub thermal_diffusivity: f64,
}

impl Default for PbdrConfig {
    fn default() -> Self {
        Self {
            cooling_rate_coefficient: 50.0,
            cooling_interval_k: 500.0,
            thermal_diffusivity: 1.0e-6,
        }
    }
}

impl PbdrConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("cooling_rate_coefficient", self.cooling_rate_coefficient),
            ("cooling_interval_k", self.cooling_interval_k),
            ("thermal_diffusivity", self.thermal_diffusivity),
        ];
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("pbdr.{name} must be finite and > 0 (got {v}).")));
            }
        }
        Ok(())
    }
}

const SECONDS_PER_MYR: f64 = 3.155_76e13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentiationBand {
    Chondritic,
    CoreLike,
    PartiallyDifferentiated,
    MantleCrustLike,
}

impl DifferentiationBand {
    pub fn from_ratio(pbdr: f64) -> Self {
        if pbdr.abs() < 0.1 {
            DifferentiationBand::Chondritic
        } else if pbdr <= -0.1 {
            DifferentiationBand::CoreLike
        } else if pbdr < 0.65 {
            DifferentiationBand::PartiallyDifferentiated
        } else {
            DifferentiationBand::MantleCrustLike
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DifferentiationBand::Chondritic => "chondritic",
            DifferentiationBand::CoreLike => "core-like",
            DifferentiationBand::PartiallyDifferentiated => "partially differentiated",
            DifferentiationBand::MantleCrustLike => "mantle/crust-like",
        }
    }
}

/// Concentration (ng/g) below which every HSE of a strongly depleted specimen
/// points to a mantle rather than a core source.
const MANTLE_HSE_CEILING: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentBodyType {
    Undifferentiated,
    PartiallyDifferentiated,
    DifferentiatedAsteroid,
    HighlyDifferentiated,
    VestaLikeMantle,
    Core,
}

impl ParentBodyType {
    /// HSE enrichment reads as core material; strong depletion is split into
    /// mantle or core by the absolute concentrations.
    pub fn classify(pbdr: f64, data: &SiderophileData) -> Self {
        if pbdr <= -0.1 {
            ParentBodyType::Core
        } else if pbdr < 0.1 {
            ParentBodyType::Undifferentiated
        } else if pbdr < 0.3 {
            ParentBodyType::PartiallyDifferentiated
        } else if pbdr < 0.6 {
            ParentBodyType::DifferentiatedAsteroid
        } else if pbdr < 0.9 {
            ParentBodyType::HighlyDifferentiated
        } else if data.concentrations.values().all(|&c| c < MANTLE_HSE_CEILING) {
            ParentBodyType::VestaLikeMantle
        } else {
            ParentBodyType::Core
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParentBodyType::Undifferentiated => "undifferentiated asteroid (chondritic)",
            ParentBodyType::PartiallyDifferentiated => "partially differentiated body",
            ParentBodyType::DifferentiatedAsteroid => "differentiated asteroid (Vesta-like)",
            ParentBodyType::HighlyDifferentiated => "highly differentiated body (mantle/crust sample)",
            ParentBodyType::VestaLikeMantle => "Vesta-like differentiated body (mantle sample)",
            ParentBodyType::Core => "core material (fully differentiated)",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbdrResult {
    pub pbdr: f64,
    pub band: DifferentiationBand,
    pub parent_body: ParentBodyType,
    /// Fraction of metal segregated into a core, `1 - exp(-5·PBDR)`.
    pub core_formation_extent: f64,
    pub cooling_rate_k_per_myr: Option<f64>,
    pub parent_body_radius_km: Option<f64>,
    pub elements_used: usize,
}

impl PbdrResult {
    pub fn to_score(&self) -> ParameterScore {
        let score = ParameterScore::new(Parameter::Pbdr, self.pbdr, self.band.label());
        match self.parent_body_radius_km {
            Some(km) => score.with_derived(DerivedQuantity::ParentBodyRadius { km }),
            None => score,
        }
    }
}

pub fn core_formation_extent(pbdr: f64) -> f64 {
    if pbdr <= 0.0 {
        0.0
    } else if pbdr >= 0.99 {
        1.0
    } else {
        1.0 - (-5.0 * pbdr).exp()
    }
}

/// Metallographic cooling rate (K/Myr) and radius (km) of a conductively
/// cooling parent body from a kamacite bandwidth in mm.
pub fn parent_body_radius(bandwidth_mm: f64, config: &PbdrConfig) -> Result<(f64, f64)> {
    if !(bandwidth_mm.is_finite() && bandwidth_mm > 0.0) {
        return Err(AppError::invalid(format!(
            "Widmanstätten bandwidth must be finite and > 0 (got {bandwidth_mm})."
        )));
    }
    let cooling_rate = config.cooling_rate_coefficient / (bandwidth_mm * bandwidth_mm);
    let kappa = config.thermal_diffusivity * SECONDS_PER_MYR;
    let radius_m = (config.cooling_interval_k * kappa / cooling_rate).sqrt();
    Ok((cooling_rate, radius_m / 1000.0))
}

pub fn calculate_pbdr(data: &SiderophileData, config: &PbdrConfig) -> Result<PbdrResult> {
    if data.concentrations.is_empty() {
        return Err(AppError::invalid("No siderophile element concentration supplied."));
    }
    let mut ratio_sum = 0.0;
    for (element, c) in &data.concentrations {
        if !(c.is_finite() && *c > 0.0) {
            return Err(AppError::invalid(format!("Concentration of {element} must be finite and > 0 (got {c}).")));
        }
        ratio_sum += c / element.ci_abundance();
    }
    let n = data.concentrations.len();
    let pbdr = 1.0 - ratio_sum / n as f64;

    let (cooling_rate_k_per_myr, parent_body_radius_km) = match data.widmanstatten_bandwidth_mm {
        Some(bw) => {
            let (cr, r) = parent_body_radius(bw, config)?;
            (Some(cr), Some(r))
        }
        None => (None, None),
    };

    Ok(PbdrResult {
        pbdr,
        band: DifferentiationBand::from_ratio(pbdr),
        parent_body: ParentBodyType::classify(pbdr, data),
        core_formation_extent: core_formation_extent(pbdr),
        cooling_rate_k_per_myr,
        parent_body_radius_km,
        elements_used: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::HseElement;

    fn scaled(factor: f64) -> SiderophileData {
        SiderophileData {
            concentrations: HseElement::ALL.into_iter().map(|e| (e, e.ci_abundance() * factor)).collect(),
            widmanstatten_bandwidth_mm: None,
        }
    }

    #[test]
    fn chondritic_abundances_give_zero() {
        let r = calculate_pbdr(&scaled(1.0), &PbdrConfig::default()).unwrap();
        assert!(r.pbdr.abs() < 1e-12);
        assert_eq!(r.band, DifferentiationBand::Chondritic);
        assert_eq!(r.core_formation_extent, 0.0);
    }

    #[test]
    fn depletion_and_enrichment_bands() {
        let mantle = calculate_pbdr(&scaled(0.05), &PbdrConfig::default()).unwrap();
        assert!((mantle.pbdr - 0.95).abs() < 1e-12);
        assert_eq!(mantle.band, DifferentiationBand::MantleCrustLike);
        assert!(mantle.core_formation_extent > 0.99);

        let core = calculate_pbdr(&scaled(3.0), &PbdrConfig::default()).unwrap();
        assert!((core.pbdr + 2.0).abs() < 1e-12);
        assert_eq!(core.band, DifferentiationBand::CoreLike);
    }

    #[test]
    fn parent_body_type_follows_depletion() {
        let cfg = PbdrConfig::default();
        let cases = [
            (1.0, ParentBodyType::Undifferentiated),
            (0.8, ParentBodyType::PartiallyDifferentiated),
            (0.5, ParentBodyType::DifferentiatedAsteroid),
            (0.2, ParentBodyType::HighlyDifferentiated),
            (0.01, ParentBodyType::VestaLikeMantle),
            (3.0, ParentBodyType::Core),
        ];
        for (factor, expected) in cases {
            let r = calculate_pbdr(&scaled(factor), &cfg).unwrap();
            assert_eq!(r.parent_body, expected, "factor={factor} pbdr={}", r.pbdr);
        }
    }

    #[test]
    fn depleted_specimen_with_rich_platinum_is_core() {
        let mut data = scaled(0.01);
        data.concentrations.insert(HseElement::Pt, 60.0);
        let r = calculate_pbdr(&data, &PbdrConfig::default()).unwrap();
        assert!(r.pbdr >= 0.9, "pbdr={}", r.pbdr);
        assert_eq!(r.parent_body, ParentBodyType::Core);
    }

    #[test]
    fn radius_from_bandwidth() {
        let (cr, r) = parent_body_radius(1.0, &PbdrConfig::default()).unwrap();
        assert!((cr - 50.0).abs() < 1e-12);
        // κ = 3.15576e7 m²/Myr, R = sqrt(500 · κ / 50) ≈ 17.8 km
        assert!((r - (500.0 * 3.155_76e7f64 / 50.0).sqrt() / 1000.0).abs() < 1e-9, "r={r}");
        let (_, wide) = parent_body_radius(2.0, &PbdrConfig::default()).unwrap();
        assert!(wide > r);
        assert!(parent_body_radius(0.0, &PbdrConfig::default()).is_err());
    }

    #[test]
    fn non_positive_concentration_is_invalid() {
        let mut data = scaled(1.0);
        data.concentrations.insert(HseElement::Pt, 0.0);
        assert!(matches!(calculate_pbdr(&data, &PbdrConfig::default()), Err(AppError::InvalidInput(_))));
        let empty = SiderophileData::default();
        assert!(matches!(calculate_pbdr(&empty, &PbdrConfig::default()), Err(AppError::InvalidInput(_))));
    }
}
