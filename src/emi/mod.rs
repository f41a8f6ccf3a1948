//! Normalization layer and the EMI composite.
//!
//! ```text
//! nᵢ  = clamp((Pᵢ - Pᵢ_min) / (Pᵢ_crit - Pᵢ_min), 0, 1)
//! EMI = Σ wᵢ·nᵢ / Σ wᵢ        (over the evaluated parameters)
//! ```
//!
//! Parameters without data are skipped and the remaining weights rescaled; the
//! composite reports which parameters were missing.

use crate::config::{Bounds, EmiConfig};
use crate::domain::{ClassificationLevel, Parameter, PerParameter};
use crate::error::{AppError, Result};

/// Rescale `value` to `[0, 1]`; inverted when `critical < min`.
pub fn normalize(value: f64, bounds: &Bounds) -> f64 {
    ((value - bounds.min) / (bounds.critical - bounds.min)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub emi: f64,
    pub level: ClassificationLevel,
    pub normalized: PerParameter<Option<f64>>,
    pub missing: Vec<Parameter>,
}

/// Weighted mean of the available normalized scores.
pub fn weighted_sum(normalized: &PerParameter<Option<f64>>, weights: &PerParameter<f64>) -> Result<f64> {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for (p, n) in normalized.iter() {
        if let Some(n) = n {
            let w = *weights.get(p);
            total += w * n;
            weight_sum += w;
        }
    }
    if weight_sum <= 0.0 {
        return Err(AppError::invalid(
            "No parameter with a positive weight could be evaluated for this specimen.",
        ));
    }
    Ok((total / weight_sum).clamp(0.0, 1.0))
}

pub fn composite(raw: &PerParameter<Option<f64>>, config: &EmiConfig) -> Result<Composite> {
    let mut missing = Vec::new();
    let mut normalized = PerParameter::<Option<f64>>::default();

    for (p, value) in raw.iter() {
        match value {
            None => missing.push(p),
            Some(v) if !v.is_finite() => {
                return Err(AppError::numerical(format!(
                    "{} raw score is not finite ({v}).",
                    p.display_name()
                )));
            }
            Some(v) => *normalized.get_mut(p) = Some(normalize(*v, config.bounds.get(p))),
        }
    }
    if missing.len() == Parameter::ALL.len() {
        return Err(AppError::invalid("No EMI parameter could be evaluated: every measurement section is missing."));
    }

    let emi = weighted_sum(&normalized, &config.weights)?;
    Ok(Composite {
        emi,
        level: config.thresholds.level_for(emi),
        normalized,
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn all(values: [f64; 7]) -> PerParameter<Option<f64>> {
        PerParameter::from_fn(|p| {
            let i = Parameter::ALL.iter().position(|q| *q == p).unwrap();
            Some(values[i])
        })
    }

    #[test]
    fn normalization_is_bounded_for_random_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let min = rng.gen_range(-100.0..100.0);
            let critical = min + rng.gen_range(-50.0..50.0);
            if min == critical {
                continue;
            }
            let v = rng.gen_range(-500.0..500.0);
            let n = normalize(v, &Bounds::new(min, critical));
            assert!((0.0..=1.0).contains(&n), "n={n} v={v} min={min} crit={critical}");
        }
    }

    #[test]
    fn inverted_bounds_flip_the_axis() {
        let b = Bounds::new(1.0, 0.0);
        assert_eq!(normalize(1.0, &b), 0.0);
        assert_eq!(normalize(0.0, &b), 1.0);
        assert!((normalize(0.25, &b) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn emi_is_monotone_in_each_normalized_score() {
        let cfg = EmiConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let base: PerParameter<Option<f64>> = PerParameter::from_fn(|_| Some(rng.gen_range(0.0..1.0)));
            let e0 = weighted_sum(&base, &cfg.weights).unwrap();
            for p in Parameter::ALL {
                let mut bumped = base;
                let v = bumped.get(p).unwrap_or(0.0);
                *bumped.get_mut(p) = Some((v + 0.1).min(1.0));
                let e1 = weighted_sum(&bumped, &cfg.weights).unwrap();
                assert!(e1 >= e0 - 1e-12, "{} decreased EMI", p.display_name());
            }
        }
    }

    #[test]
    fn pristine_and_anomalous_extremes() {
        let cfg = EmiConfig::default();
        // MCC/IAF at 1 are pristine; the rest at their minimum.
        let pristine = composite(&all([1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]), &cfg).unwrap();
        assert!(pristine.emi < 0.20);
        assert_eq!(pristine.level, ClassificationLevel::Unambiguous);

        let anomalous = composite(&all([0.0, 55.0, 1.0, 0.0, 6000.0, 1.0, 100.0]), &cfg).unwrap();
        assert!(anomalous.emi > 0.80);
        assert_eq!(anomalous.level, ClassificationLevel::UngroupedCandidate);
    }

    #[test]
    fn missing_parameters_are_reweighted() {
        let cfg = EmiConfig::default();
        let mut raw = PerParameter::<Option<f64>>::default();
        raw.smg = Some(55.0);
        raw.twi = Some(0.0);
        let c = composite(&raw, &cfg).unwrap();
        let expected = 0.19 / (0.19 + 0.18);
        assert!((c.emi - expected).abs() < 1e-12, "emi={}", c.emi);
        assert_eq!(c.missing.len(), 5);
        assert!(c.normalized.mcc.is_none());
    }

    #[test]
    fn nothing_to_score_is_invalid() {
        let err = composite(&PerParameter::default(), &EmiConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_raw_is_numerical() {
        let mut raw = PerParameter::<Option<f64>>::default();
        raw.atp = Some(f64::NAN);
        assert!(matches!(composite(&raw, &EmiConfig::default()), Err(AppError::Numerical(_))));
    }
}
