//! Geochemical reference constants.
//!
//! - CI-chondrite abundances of the highly siderophile elements (PBDR)
//! - cosmogenic nuclide production rates, half-lives and attenuation lengths (CNEA)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Highly siderophile elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HseElement {
    Os,
    Ir,
    Ru,
    Pt,
    Pd,
    Re,
    Au,
}

impl HseElement {
    pub const ALL: [HseElement; 7] = [
        HseElement::Os,
        HseElement::Ir,
        HseElement::Ru,
        HseElement::Pt,
        HseElement::Pd,
        HseElement::Re,
        HseElement::Au,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            HseElement::Os => "Os",
            HseElement::Ir => "Ir",
            HseElement::Ru => "Ru",
            HseElement::Pt => "Pt",
            HseElement::Pd => "Pd",
            HseElement::Re => "Re",
            HseElement::Au => "Au",
        }
    }

    /// CI-chondrite abundance (ng/g).
    pub fn ci_abundance(self) -> f64 {
        match self {
            HseElement::Os => 486.0,
            HseElement::Ir => 481.0,
            HseElement::Ru => 712.0,
            HseElement::Pt => 1010.0,
            HseElement::Pd => 560.0,
            HseElement::Re => 37.0,
            HseElement::Au => 140.0,
        }
    }
}

impl fmt::Display for HseElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for HseElement {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        HseElement::ALL
            .into_iter()
            .find(|e| e.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::invalid(format!("Unknown siderophile element '{wanted}'.")))
    }
}

/// Cosmogenic nuclides.
///
/// Concentrations are expressed in the same unit as the production rate times Ma,
/// so a stable nuclide's apparent age is simply `N / P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nuclide {
    He3,
    Ne21,
    Ar38,
    Be10,
    Al26,
    Cl36,
}

impl Nuclide {
    pub const ALL: [Nuclide; 6] = [
        Nuclide::He3,
        Nuclide::Ne21,
        Nuclide::Ar38,
        Nuclide::Be10,
        Nuclide::Al26,
        Nuclide::Cl36,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Nuclide::He3 => "he3",
            Nuclide::Ne21 => "ne21",
            Nuclide::Ar38 => "ar38",
            Nuclide::Be10 => "be10",
            Nuclide::Al26 => "al26",
            Nuclide::Cl36 => "cl36",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Nuclide::He3 => "³He",
            Nuclide::Ne21 => "²¹Ne",
            Nuclide::Ar38 => "³⁸Ar",
            Nuclide::Be10 => "¹⁰Be",
            Nuclide::Al26 => "²⁶Al",
            Nuclide::Cl36 => "³⁶Cl",
        }
    }

    /// Unshielded production rate (concentration units per Ma).
    pub fn production_rate(self) -> f64 {
        match self {
            Nuclide::He3 => 1.5,
            Nuclide::Ne21 => 0.35,
            Nuclide::Ar38 => 0.08,
            Nuclide::Be10 => 0.05,
            Nuclide::Al26 => 0.07,
            Nuclide::Cl36 => 0.03,
        }
    }

    /// Half-life (Ma) for radioactive nuclides.
    pub fn half_life_ma(self) -> Option<f64> {
        match self {
            Nuclide::Be10 => Some(1.387),
            Nuclide::Al26 => Some(0.717),
            Nuclide::Cl36 => Some(0.301),
            Nuclide::He3 | Nuclide::Ne21 | Nuclide::Ar38 => None,
        }
    }

    /// Decay constant λ = ln 2 / t½ (1/Ma).
    pub fn decay_constant(self) -> Option<f64> {
        self.half_life_ma().map(|t| std::f64::consts::LN_2 / t)
    }

    pub fn is_radioactive(self) -> bool {
        self.half_life_ma().is_some()
    }

    /// Effective attenuation length of the production rate (g/cm²).
    pub fn attenuation_length(self) -> f64 {
        match self {
            Nuclide::He3 => 165.0,
            Nuclide::Ne21 => 140.0,
            Nuclide::Ar38 => 120.0,
            Nuclide::Be10 => 160.0,
            Nuclide::Al26 => 150.0,
            Nuclide::Cl36 => 110.0,
        }
    }

    /// Relative 1σ uncertainty of an apparent age.
    pub fn relative_uncertainty(self) -> f64 {
        if self.is_radioactive() { 0.12 } else { 0.08 }
    }
}

impl fmt::Display for Nuclide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Nuclide {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Nuclide::ALL
            .into_iter()
            .find(|n| n.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::invalid(format!("Unknown cosmogenic nuclide '{wanted}'.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_radioactive_nuclides_decay() {
        for n in Nuclide::ALL {
            assert_eq!(n.decay_constant().is_some(), n.is_radioactive());
        }
        let lambda = Nuclide::Al26.decay_constant().unwrap();
        assert!((lambda - std::f64::consts::LN_2 / 0.717).abs() < 1e-12);
    }

    #[test]
    fn symbols_round_trip_through_from_str() {
        for e in HseElement::ALL {
            assert_eq!(e.symbol().parse::<HseElement>().unwrap(), e);
        }
        assert_eq!("NE21".parse::<Nuclide>().unwrap(), Nuclide::Ne21);
    }
}
