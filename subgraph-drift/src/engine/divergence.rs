//! Divergence estimation over the trailing entropy buffer
//!
//! The decision engine hands an estimator the last `2n + k - 1` entropy
//! values and gets back a non-negative score; larger means the older and
//! newer halves of the buffer look less alike. The estimator owns its own
//! parameters and internals.
//!
//! [`KernelMmdEstimator`] is the estimator used by the binary. Anything
//! implementing [`DivergenceEstimator`], including plain closures, can
//! replace it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("Expected a window of {expected} values, got {actual}")]
    WindowLength { expected: usize, actual: usize },
    #[error("Non-finite value {value} at window position {position}")]
    NonFinite { position: usize, value: f64 },
    #[error("Invalid estimator parameter: {0}")]
    InvalidParameter(String),
    #[error("Estimation failed: {0}")]
    Failed(String),
}

/// Scores the divergence between the reference and test parts of a window
pub trait DivergenceEstimator {
    fn score(&self, window: &[f64]) -> Result<f64, EstimatorError>;
}

impl<F> DivergenceEstimator for F
where
    F: Fn(&[f64]) -> Result<f64, EstimatorError>,
{
    fn score(&self, window: &[f64]) -> Result<f64, EstimatorError> {
        self(window)
    }
}

/// Squared maximum mean discrepancy between reference and test subsequences.
///
/// The window is cut into `2n` overlapping subsequences of length `k`
/// (step 1). The first `n` are the reference sample, the last `n` the test
/// sample, compared under a Gaussian kernel of fixed bandwidth.
#[derive(Debug, Clone)]
pub struct KernelMmdEstimator {
    reference_window: usize,
    test_window: usize,
    bandwidth: f64,
}

impl KernelMmdEstimator {
    /// Create an estimator for reference size `n`, subsequence length `k`
    pub fn new(n: usize, k: usize, bandwidth: f64) -> Result<Self, EstimatorError> {
        if n == 0 || k == 0 {
            return Err(EstimatorError::InvalidParameter(format!(
                "window sizes must be positive (n = {n}, k = {k})"
            )));
        }
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(EstimatorError::InvalidParameter(format!(
                "bandwidth must be positive and finite, got {bandwidth}"
            )));
        }

        Ok(Self {
            reference_window: n,
            test_window: k,
            bandwidth,
        })
    }

    /// Number of values expected per call
    pub fn window_len(&self) -> usize {
        2 * self.reference_window + self.test_window - 1
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
        (-sq_dist / (2.0 * self.bandwidth * self.bandwidth)).exp()
    }

    fn mean_kernel(&self, xs: &[&[f64]], ys: &[&[f64]]) -> f64 {
        let mut sum = 0.0;
        for x in xs {
            for y in ys {
                sum += self.kernel(x, y);
            }
        }
        sum / (xs.len() * ys.len()) as f64
    }
}

impl DivergenceEstimator for KernelMmdEstimator {
    fn score(&self, window: &[f64]) -> Result<f64, EstimatorError> {
        let expected = self.window_len();
        if window.len() != expected {
            return Err(EstimatorError::WindowLength {
                expected,
                actual: window.len(),
            });
        }
        if let Some((position, &value)) = window.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(EstimatorError::NonFinite { position, value });
        }

        let subsequences: Vec<&[f64]> = window.windows(self.test_window).collect();
        let (reference, test) = subsequences.split_at(self.reference_window);

        let mmd = self.mean_kernel(reference, reference) + self.mean_kernel(test, test)
            - 2.0 * self.mean_kernel(reference, test);

        // rounding can push a zero discrepancy slightly negative
        Ok(mmd.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_window_scores_zero() {
        let estimator = KernelMmdEstimator::new(2, 2, 1.0).unwrap();
        assert_eq!(estimator.score(&[2.0; 5]).unwrap(), 0.0);
    }

    #[test]
    fn test_single_step_score() {
        let estimator = KernelMmdEstimator::new(2, 2, 1.0).unwrap();
        let last = 3f64.log2();
        let score = estimator.score(&[2.0, 2.0, 2.0, 2.0, last]).unwrap();

        // reference {(2,2),(2,2)} vs test {(2,2),(2,last)}: 0.5 * (1 - K)
        let kernel = (-(2.0 - last).powi(2) / 2.0).exp();
        assert!((score - 0.5 * (1.0 - kernel)).abs() < 1e-12);
    }

    #[test]
    fn test_larger_shift_scores_higher() {
        let estimator = KernelMmdEstimator::new(3, 2, 1.0).unwrap();
        let small = estimator.score(&[0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.5]).unwrap();
        let large = estimator.score(&[0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0]).unwrap();
        assert!(small > 0.0);
        assert!(large > small);
    }

    #[test]
    fn test_wrong_window_length() {
        let estimator = KernelMmdEstimator::new(2, 2, 1.0).unwrap();
        assert_eq!(estimator.window_len(), 5);
        assert_eq!(
            estimator.score(&[0.0; 4]),
            Err(EstimatorError::WindowLength { expected: 5, actual: 4 })
        );
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let estimator = KernelMmdEstimator::new(1, 1, 1.0).unwrap();
        assert_eq!(estimator.window_len(), 2);
        let err = estimator.score(&[0.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, EstimatorError::NonFinite { position: 1, .. }));

        let err = estimator.score(&[f64::INFINITY, 0.0]).unwrap_err();
        assert!(matches!(err, EstimatorError::NonFinite { position: 0, .. }));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(KernelMmdEstimator::new(0, 2, 1.0).is_err());
        assert!(KernelMmdEstimator::new(2, 0, 1.0).is_err());
        assert!(KernelMmdEstimator::new(2, 2, 0.0).is_err());
        assert!(KernelMmdEstimator::new(2, 2, f64::INFINITY).is_err());
    }

    #[test]
    fn test_closure_is_an_estimator() {
        let spread = |w: &[f64]| -> Result<f64, EstimatorError> {
            let max = w.iter().cloned().fold(f64::MIN, f64::max);
            let min = w.iter().cloned().fold(f64::MAX, f64::min);
            Ok(max - min)
        };
        let boxed: Box<dyn DivergenceEstimator> = Box::new(spread);
        assert_eq!(boxed.score(&[1.0, 4.0, 2.0]).unwrap(), 3.0);
    }
}
