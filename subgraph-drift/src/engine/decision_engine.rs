//! Decision Engine for drift evaluation

use crate::engine::divergence::{DivergenceEstimator, EstimatorError};
use crate::engine::oracle::DriftOracle;
use crate::Config;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Step at t={t} precedes the first full window (width {window_width})")]
    BeforeWindow { t: usize, window_width: usize },
    #[error("Out-of-sequence step: expected entropy index {expected}, got {actual}")]
    OutOfSequence { expected: usize, actual: usize },
    #[error("Divergence estimation failed at t={t}: {source}")]
    Estimator {
        t: usize,
        #[source]
        source: EstimatorError,
    },
}

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftParams {
    /// Reference sub-window size (n)
    pub reference_window: usize,
    /// Test sub-window size (k)
    pub test_window: usize,
    /// Window width (w): entropy lookback and score-threshold lookback
    pub window_width: usize,
    /// Threshold used until more than `window_width` scores exist
    pub default_threshold: f64,
    /// Lower bound on the effective threshold
    pub threshold_floor: f64,
}

impl DriftParams {
    /// Entropy values per divergence evaluation: `2n + k - 1`
    pub fn buffer_width(&self) -> usize {
        2 * self.reference_window + self.test_window - 1
    }

    /// Steps suppressed after a confirmed drift: `2n + k`
    pub fn cooldown(&self) -> usize {
        2 * self.reference_window + self.test_window
    }
}

impl From<&Config> for DriftParams {
    fn from(config: &Config) -> Self {
        Self {
            reference_window: config.reference_window,
            test_window: config.test_window,
            window_width: config.window_width,
            default_threshold: config.default_threshold,
            threshold_floor: config.threshold_floor,
        }
    }
}

/// Outcome of one divergence evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Score below threshold
    Stable,
    /// Crossing confirmed as drift
    Drift,
    /// Crossing rejected, too close to the previous warning to count again
    Warning,
    /// Crossing rejected and recorded as a new false alarm
    FalseAlarm,
}

/// Result of an evaluated step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftDecision {
    /// Stream position
    pub t: usize,
    /// Entropy index (`t - window_width`)
    pub index: usize,
    pub score: f64,
    pub threshold: f64,
    pub signal: Signal,
    /// Entropy index of the next evaluation
    pub next_eligible_index: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Alarm bookkeeping for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub drifts: Vec<usize>,
    pub warnings: Vec<usize>,
    pub false_alarms: Vec<usize>,
    pub next_eligible_index: usize,
}

/// Decision Engine that turns the entropy trace into drift reports
pub struct DriftDecisionEngine {
    params: DriftParams,
    estimator: Box<dyn DivergenceEstimator>,
    oracle: Box<dyn DriftOracle>,
    entropy: Vec<f64>,
    scores: Vec<f64>,
    alarms: AlarmState,
}

impl DriftDecisionEngine {
    /// Create a new decision engine
    pub fn new(
        params: DriftParams,
        estimator: Box<dyn DivergenceEstimator>,
        oracle: Box<dyn DriftOracle>,
    ) -> Self {
        Self {
            params,
            estimator,
            oracle,
            entropy: Vec::new(),
            scores: Vec::new(),
            alarms: AlarmState {
                next_eligible_index: params.buffer_width(),
                ..AlarmState::default()
            },
        }
    }

    /// Record the window entropy for stream position `t` and, when due,
    /// evaluate the trailing buffer.
    ///
    /// Returns `None` on steps where no evaluation is scheduled.
    pub fn step(&mut self, t: usize, entropy: f64) -> Result<Option<DriftDecision>, DecisionError> {
        let window_width = self.params.window_width;
        let index = t
            .checked_sub(window_width)
            .ok_or(DecisionError::BeforeWindow { t, window_width })?;
        if index != self.entropy.len() {
            return Err(DecisionError::OutOfSequence {
                expected: self.entropy.len(),
                actual: index,
            });
        }

        self.entropy.push(entropy);
        if index == 0 {
            info!("Window size reached at t={}, tracking entropy", t);
        }

        let buffer_width = self.params.buffer_width();
        if index < buffer_width || index != self.alarms.next_eligible_index {
            return Ok(None);
        }
        if index == buffer_width {
            info!("Entropy buffer full at t={}, scoring divergence", t);
        }

        let window = &self.entropy[index - buffer_width..index];
        let score = self
            .estimator
            .score(window)
            .map_err(|source| DecisionError::Estimator { t, source })?;
        self.scores.push(score);

        let threshold = self.threshold();
        let cooldown = self.params.cooldown();

        let signal = if score < threshold {
            self.alarms.next_eligible_index = index + 1;
            Signal::Stable
        } else if self.oracle.is_real_drift(t) {
            self.alarms.drifts.push(t);
            self.alarms.next_eligible_index = index + cooldown;
            info!("Drift detected at t={} (score {:.4}, threshold {:.4})", t, score, threshold);
            Signal::Drift
        } else {
            let is_new = match self.alarms.warnings.last() {
                Some(&previous) => t - previous >= cooldown,
                None => true,
            };
            self.alarms.warnings.push(t);
            self.alarms.next_eligible_index = index + 1;
            if is_new {
                self.alarms.false_alarms.push(t);
                warn!("False alarm at t={} (score {:.4}, threshold {:.4})", t, score, threshold);
                Signal::FalseAlarm
            } else {
                Signal::Warning
            }
        };

        debug!(t, score, threshold, ?signal, "Divergence evaluated");

        Ok(Some(DriftDecision {
            t,
            index,
            score,
            threshold,
            signal,
            next_eligible_index: self.alarms.next_eligible_index,
            timestamp: chrono::Utc::now(),
        }))
    }

    /// Effective threshold for the newest score.
    ///
    /// Mean plus population standard deviation of the last `window_width`
    /// scores once more than that many exist, otherwise the default; never
    /// below the floor.
    pub fn threshold(&self) -> f64 {
        let lookback = self.params.window_width;
        let adaptive = if self.scores.len() > lookback {
            let recent = &self.scores[self.scores.len() - lookback..];
            let mean = recent.iter().sum::<f64>() / lookback as f64;
            let variance = recent.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / lookback as f64;
            mean + variance.sqrt()
        } else {
            self.params.default_threshold
        };
        adaptive.max(self.params.threshold_floor)
    }

    pub fn params(&self) -> &DriftParams {
        &self.params
    }

    pub fn entropy_trace(&self) -> &[f64] {
        &self.entropy
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn alarms(&self) -> &AlarmState {
        &self.alarms
    }

    /// Clear all traces and alarms, keeping parameters, estimator and oracle
    pub fn reset(&mut self) {
        self.entropy.clear();
        self.scores.clear();
        self.alarms = AlarmState {
            next_eligible_index: self.params.buffer_width(),
            ..AlarmState::default()
        };
    }

    /// Consume the engine, yielding `(scores, entropy, alarms)`
    pub fn into_traces(self) -> (Vec<f64>, Vec<f64>, AlarmState) {
        (self.scores, self.entropy, self.alarms)
    }
}
