//! Distances in composition space.
//!
//! MCC measures how far a specimen sits from a group centroid with the
//! Mahalanobis distance
//!
//! ```text
//! d = sqrt((x - μ)^T Σ^-1 (x - μ))
//! ```
//!
//! computed through a Cholesky factorization of Σ. When Σ is not positive
//! definite we fall back to a Euclidean distance scaled by the mean variance on
//! the diagonal and mark the result `singular` so callers can flag low
//! confidence.

use nalgebra::{DMatrix, DVector};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    pub value: f64,
    /// True when the covariance could not be factorized and the scaled
    /// Euclidean fallback was used.
    pub singular: bool,
}

pub fn mahalanobis(observation: &[f64], mean: &[f64], covariance: &DMatrix<f64>) -> Result<Distance> {
    let n = mean.len();
    if observation.len() != n {
        return Err(AppError::invalid(format!(
            "Dimension mismatch: observation has {} components, centroid has {n}.",
            observation.len()
        )));
    }
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(AppError::invalid(format!(
            "Covariance is {}x{}, expected {n}x{n}.",
            covariance.nrows(),
            covariance.ncols()
        )));
    }
    if observation.iter().any(|v| !v.is_finite()) {
        return Err(AppError::invalid("Observation contains a non-finite component."));
    }

    let diff = DVector::from_iterator(n, observation.iter().zip(mean).map(|(x, m)| x - m));

    if let Some(chol) = covariance.clone().cholesky() {
        let solved = chol.solve(&diff);
        let d2 = diff.dot(&solved);
        if d2.is_finite() && d2 >= 0.0 {
            return Ok(Distance { value: d2.sqrt(), singular: false });
        }
    }

    let positive: Vec<f64> = covariance.diagonal().iter().copied().filter(|v| *v > 0.0 && v.is_finite()).collect();
    let scale = if positive.is_empty() {
        1.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    };
    let value = (diff.dot(&diff) / scale).sqrt();
    if !value.is_finite() {
        return Err(AppError::numerical("Distance fallback produced a non-finite value."));
    }
    Ok(Distance { value, singular: true })
}

pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AppError::invalid(format!(
            "Dimension mismatch: {} vs {} components.",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_covariance_matches_euclidean() {
        let cov = DMatrix::<f64>::identity(3, 3);
        let d = mahalanobis(&[1.0, 2.0, 2.0], &[0.0, 0.0, 0.0], &cov).unwrap();
        assert!(!d.singular);
        assert!((d.value - 3.0).abs() < 1e-12);
        assert!((euclidean(&[1.0, 2.0, 2.0], &[0.0; 3]).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn variance_scales_distance() {
        let cov = DMatrix::from_row_slice(1, 1, &[4.0]);
        let d = mahalanobis(&[4.0], &[0.0], &cov).unwrap();
        assert!((d.value - 2.0).abs() < 1e-12, "d={}", d.value);
    }

    #[test]
    fn singular_covariance_falls_back_and_flags() {
        let cov = DMatrix::from_row_slice(3, 3, &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let d = mahalanobis(&[1.0, 0.0, 0.0], &[0.0, 0.0, 0.0], &cov).unwrap();
        assert!(d.singular);
        assert!(d.value.is_finite() && d.value > 0.0);
    }

    #[test]
    fn dimension_mismatch_is_invalid_input() {
        let cov = DMatrix::<f64>::identity(3, 3);
        let err = mahalanobis(&[1.0, 2.0], &[0.0, 0.0, 0.0], &cov).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
