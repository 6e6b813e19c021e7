//! Alarm classification hooks
//!
//! When the divergence score crosses the threshold, the decision engine asks
//! an oracle whether the crossing is a genuine drift. In benchmarks the
//! oracle knows where the drifts were planted; in deployment there is no
//! ground truth and every crossing is reported as drift.

use serde::{Deserialize, Serialize};

/// Confirms or rejects a threshold crossing at stream position `t`
pub trait DriftOracle {
    fn is_real_drift(&self, t: usize) -> bool;
}

/// Ground truth from a labelled benchmark stream.
///
/// A crossing at `t` is real when some known drift point `j` satisfies
/// `j <= t < j + tolerance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownDriftOracle {
    drift_points: Vec<usize>,
    tolerance: usize,
}

impl KnownDriftOracle {
    pub fn new(drift_points: Vec<usize>, tolerance: usize) -> Self {
        Self {
            drift_points,
            tolerance,
        }
    }

    pub fn drift_points(&self) -> &[usize] {
        &self.drift_points
    }
}

impl DriftOracle for KnownDriftOracle {
    fn is_real_drift(&self, t: usize) -> bool {
        self.drift_points
            .iter()
            .any(|&j| j <= t && t < j + self.tolerance)
    }
}

/// Deployment mode: every crossing is a drift report
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllOracle;

impl DriftOracle for AcceptAllOracle {
    fn is_real_drift(&self, _t: usize) -> bool {
        true
    }
}

/// Which oracle an experiment runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleMode {
    /// Classify crossings against the dataset's known drift points
    #[default]
    GroundTruth,
    /// Report every crossing as drift
    Unsupervised,
}
