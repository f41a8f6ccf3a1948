//! TWI: Terrestrial Weathering Index.
//!
//! Weighted mean of five weathering indicators in `[0, 1]`. Missing indicators
//! drop out and the remaining weights are rescaled; the result is then flagged
//! low-confidence. A terrestrial residence age is estimated from the index.

use crate::domain::{DerivedQuantity, Parameter, ParameterScore, WeatheringIndicators};
use crate::error::{AppError, Result};

const WEIGHTS: [(&str, f64); 5] = [
    ("metal_oxidation", 0.30),
    ("phyllosilicate", 0.25),
    ("carbonate_veins", 0.20),
    ("be_ne_deviation", 0.15),
    ("fe_ni_deviation", 0.10),
];

const AGE_SCALE_YEARS: f64 = 12_400.0;
const AGE_SHAPE: f64 = 3.7;
pub const AGE_PRECISION_YEARS: f64 = 8_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TwiResult {
    pub twi: f64,
    pub grade: &'static str,
    pub terrestrial_age_years: f64,
    pub indicators_used: usize,
    pub low_confidence: bool,
}

impl TwiResult {
    pub fn to_score(&self) -> ParameterScore {
        ParameterScore::new(Parameter::Twi, self.twi, self.grade)
            .with_derived(DerivedQuantity::TerrestrialAge {
                years: self.terrestrial_age_years,
                precision_years: AGE_PRECISION_YEARS,
            })
            .flagged(self.low_confidence)
    }
}

/// Weathering grade W0–W4/5.
pub fn weathering_grade(twi: f64) -> &'static str {
    if twi < 0.15 {
        "W0"
    } else if twi < 0.30 {
        "W1"
    } else if twi < 0.50 {
        "W2"
    } else if twi < 0.70 {
        "W3"
    } else {
        "W4/5"
    }
}

pub fn terrestrial_age_years(twi: f64) -> f64 {
    AGE_SCALE_YEARS * (1.0 + AGE_SHAPE * twi).ln()
}

pub fn calculate_twi(indicators: &WeatheringIndicators) -> Result<TwiResult> {
    let values = [
        indicators.metal_oxidation,
        indicators.phyllosilicate,
        indicators.carbonate_veins,
        indicators.be_ne_deviation,
        indicators.fe_ni_deviation,
    ];

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    let mut used = 0;
    for ((name, w), value) in WEIGHTS.iter().zip(values) {
        let Some(v) = value else { continue };
        if !(v.is_finite() && (0.0..=1.0).contains(&v)) {
            return Err(AppError::invalid(format!("Weathering indicator {name} must be in [0, 1] (got {v}).")));
        }
        weighted += w * v;
        weight_sum += w;
        used += 1;
    }
    if used == 0 {
        return Err(AppError::invalid("No weathering indicator supplied."));
    }

    let twi = (weighted / weight_sum).clamp(0.0, 1.0);
    Ok(TwiResult {
        twi,
        grade: weathering_grade(twi),
        terrestrial_age_years: terrestrial_age_years(twi),
        indicators_used: used,
        low_confidence: used < WEIGHTS.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(v: f64) -> WeatheringIndicators {
        WeatheringIndicators {
            metal_oxidation: Some(v),
            phyllosilicate: Some(v),
            carbonate_veins: Some(v),
            be_ne_deviation: Some(v),
            fe_ni_deviation: Some(v),
        }
    }

    #[test]
    fn fresh_fall_has_zero_index_and_age() {
        let r = calculate_twi(&full(0.0)).unwrap();
        assert_eq!(r.twi, 0.0);
        assert_eq!(r.terrestrial_age_years, 0.0);
        assert_eq!(r.grade, "W0");
        assert!(!r.low_confidence);
    }

    #[test]
    fn missing_indicators_rescale_weights() {
        let ind = WeatheringIndicators {
            metal_oxidation: Some(0.6),
            phyllosilicate: Some(0.2),
            ..WeatheringIndicators::default()
        };
        let r = calculate_twi(&ind).unwrap();
        let expected = (0.30 * 0.6 + 0.25 * 0.2) / 0.55;
        assert!((r.twi - expected).abs() < 1e-12, "twi={}", r.twi);
        assert!(r.low_confidence);
        assert_eq!(r.indicators_used, 2);
    }

    #[test]
    fn age_grows_with_index() {
        let a = calculate_twi(&full(0.3)).unwrap();
        let b = calculate_twi(&full(0.8)).unwrap();
        assert!(b.terrestrial_age_years > a.terrestrial_age_years);
        assert!((b.terrestrial_age_years - 12_400.0 * (1.0 + 3.7 * 0.8f64).ln()).abs() < 1e-6);
        assert_eq!(b.grade, "W4/5");
    }

    #[test]
    fn empty_and_out_of_range_are_invalid() {
        assert!(matches!(calculate_twi(&WeatheringIndicators::default()), Err(AppError::InvalidInput(_))));
        let mut ind = full(0.1);
        ind.carbonate_veins = Some(-0.1);
        assert!(matches!(calculate_twi(&ind), Err(AppError::InvalidInput(_))));
    }
}
