//! Grids and one-dimensional minimization.
//!
//! The CNEA joint solve scans a log-spaced age grid and then refines the best
//! bracket with a golden-section search. Both are deterministic.

use crate::error::{AppError, Result};

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(AppError::config(format!(
            "Invalid log range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::config("Grid steps must be >= 2."));
    }

    let ln_min = min.ln();
    let step = (max.ln() - ln_min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| (ln_min + step * i as f64).exp()).collect())
}

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
/// A single step yields `[min]`.
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>> {
    if !(min.is_finite() && max.is_finite() && max >= min) {
        return Err(AppError::config(format!("Invalid range: min={min}, max={max}.")));
    }
    if steps == 0 {
        return Err(AppError::config("Grid steps must be >= 1."));
    }
    if steps == 1 {
        return Ok(vec![min]);
    }
    let step = (max - min) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| min + step * i as f64).collect())
}

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Minimize a unimodal `f` on `[lo, hi]`; returns `(x, f(x))`.
pub fn golden_section_min<F>(f: F, mut lo: f64, mut hi: f64, tol: f64, max_iter: usize) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let mut c = hi - INV_PHI * (hi - lo);
    let mut d = lo + INV_PHI * (hi - lo);
    let mut fc = f(c);
    let mut fd = f(d);

    for _ in 0..max_iter {
        if (hi - lo).abs() <= tol {
            break;
        }
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - INV_PHI * (hi - lo);
            fc = f(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + INV_PHI * (hi - lo);
            fd = f(d);
        }
    }

    let x = 0.5 * (lo + hi);
    let fx = f(x);
    // Keep whichever interior probe is best; guards against a flat bracket.
    [(x, fx), (c, fc), (d, fd)]
        .into_iter()
        .fold((x, fx), |best, cand| if cand.1 < best.1 { cand } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 500.0, 7).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 500.0).abs() < 1e-9);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn linspace_single_step() {
        assert_eq!(linspace(0.0, 10.0, 1).unwrap(), vec![0.0]);
        let v = linspace(0.0, 150.0, 151).unwrap();
        assert!((v[10] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn golden_section_finds_parabola_minimum() {
        let (x, fx) = golden_section_min(|x| (x - 2.5) * (x - 2.5) + 1.0, 0.0, 10.0, 1e-9, 200);
        assert!((x - 2.5).abs() < 1e-6, "x={x}");
        assert!((fx - 1.0).abs() < 1e-10);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(log_space(0.0, 1.0, 5).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
        assert!(linspace(2.0, 1.0, 3).is_err());
    }
}
