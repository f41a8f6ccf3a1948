//! Bulk material properties of entering meteoroids (ATP).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryComposition {
    #[default]
    Stony,
    Carbonaceous,
    StonyIron,
    Iron,
}

/// Thermophysical and mechanical properties used by the ablation model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Bulk density (kg/m³).
    pub density: f64,
    /// Specific heat capacity (J/kg·K).
    pub heat_capacity: f64,
    /// Thermal conductivity (W/m·K).
    pub conductivity: f64,
    pub emissivity: f64,
    /// Bulk strength against aerodynamic loading (Pa).
    pub strength_pa: f64,
    /// Vapour-limited ceiling of the surface temperature (K).
    pub max_surface_temperature_k: f64,
    /// Effective heat of ablation (J/kg).
    pub heat_of_ablation: f64,
    /// Mean molar mass of the vapour (kg/mol).
    pub molar_mass: f64,
    /// Temperature at which the vapour pressure reaches one atmosphere (K).
    pub boiling_point_k: f64,
}

impl EntryComposition {
    pub const ALL: [EntryComposition; 4] = [
        EntryComposition::Stony,
        EntryComposition::Carbonaceous,
        EntryComposition::StonyIron,
        EntryComposition::Iron,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntryComposition::Stony => "stony",
            EntryComposition::Carbonaceous => "carbonaceous",
            EntryComposition::StonyIron => "stony-iron",
            EntryComposition::Iron => "iron",
        }
    }

    pub fn material(self) -> Material {
        match self {
            EntryComposition::Stony => Material {
                density: 3300.0,
                heat_capacity: 1000.0,
                conductivity: 2.0,
                emissivity: 0.88,
                strength_pa: 1.0e6,
                max_surface_temperature_k: 5100.0,
                heat_of_ablation: 8.0e6,
                molar_mass: 0.050,
                boiling_point_k: 3200.0,
            },
            EntryComposition::Carbonaceous => Material {
                density: 2200.0,
                heat_capacity: 1100.0,
                conductivity: 1.0,
                emissivity: 0.90,
                strength_pa: 2.0e5,
                max_surface_temperature_k: 4600.0,
                heat_of_ablation: 5.0e6,
                molar_mass: 0.040,
                boiling_point_k: 2900.0,
            },
            EntryComposition::StonyIron => Material {
                density: 4800.0,
                heat_capacity: 800.0,
                conductivity: 10.0,
                emissivity: 0.85,
                strength_pa: 1.0e7,
                max_surface_temperature_k: 4800.0,
                heat_of_ablation: 8.0e6,
                molar_mass: 0.050,
                boiling_point_k: 3100.0,
            },
            EntryComposition::Iron => Material {
                density: 7800.0,
                heat_capacity: 450.0,
                conductivity: 40.0,
                emissivity: 0.80,
                strength_pa: 5.0e7,
                max_surface_temperature_k: 4400.0,
                heat_of_ablation: 8.0e6,
                molar_mass: 0.056,
                boiling_point_k: 3130.0,
            },
        }
    }
}

const GAS_CONSTANT: f64 = 8.314_462;
const ATMOSPHERE_PA: f64 = 101_325.0;

impl Material {
    /// Clausius-Clapeyron slope `Q*·μ/R` (K).
    pub fn vaporization_temperature(&self) -> f64 {
        self.heat_of_ablation * self.molar_mass / GAS_CONSTANT
    }

    /// Equilibrium vapour pressure at surface temperature `t_k` (Pa).
    pub fn vapour_pressure(&self, t_k: f64) -> f64 {
        ATMOSPHERE_PA * (self.vaporization_temperature() * (1.0 / self.boiling_point_k - 1.0 / t_k)).exp()
    }

    /// Hertz-Knudsen free evaporation flux at `t_k` (kg/m²·s).
    pub fn evaporation_flux(&self, t_k: f64) -> f64 {
        let t = t_k.max(1.0);
        self.vapour_pressure(t) * (self.molar_mass / (2.0 * std::f64::consts::PI * GAS_CONSTANT * t)).sqrt()
    }
}

impl fmt::Display for EntryComposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the class names (`stony`, `iron`, ...) and common group labels such
/// as `LL5`, `CM2` or `IIIAB`.
impl FromStr for EntryComposition {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let lower = raw.to_ascii_lowercase();
        let by_name = EntryComposition::ALL.into_iter().find(|c| c.name() == lower);
        if let Some(c) = by_name {
            return Ok(c);
        }
        match lower.as_str() {
            "stony_iron" | "stonyiron" | "pallasite" | "mesosiderite" => return Ok(EntryComposition::StonyIron),
            "chondrite" | "achondrite" => return Ok(EntryComposition::Stony),
            _ => {}
        }

        let upper = raw.to_ascii_uppercase();
        let letters: String = upper.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        if letters.is_empty() {
            return Err(AppError::invalid(format!("Unknown entry composition '{raw}'.")));
        }
        if letters.starts_with('I') {
            return Ok(EntryComposition::Iron);
        }
        if letters.starts_with('C') {
            return Ok(EntryComposition::Carbonaceous);
        }
        if matches!(letters.as_str(), "H" | "L" | "LL" | "EH" | "EL" | "R" | "K" | "HED" | "URE" | "AUB") {
            return Ok(EntryComposition::Stony);
        }
        Err(AppError::invalid(format!("Unknown entry composition '{raw}'.")))
    }
}
