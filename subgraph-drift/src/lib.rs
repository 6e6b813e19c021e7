//! Subgraph-Drift - Concept drift detection on graph streams
//!
//! Tracks how the discriminative subgraphs mined from each stream item recur
//! over a sliding window, turns that into an entropy trace, and flags the
//! positions where the trace's distribution shifts.

pub mod dataset;
pub mod engine;
pub mod experiment;
pub mod graph;
pub mod logging;
pub mod metrics;

/// Re-export commonly used types
pub use dataset::{Dataset, DatasetFormat};
pub use engine::{DriftDecisionEngine, DriftDetectionLoop, SubgraphWindowTracker};
pub use experiment::{run_experiment, ExperimentReport};
pub use graph::{GraphMatcher, LabeledGraph, SubgraphCount};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reference sub-window size (n)
    pub reference_window: usize,
    /// Test sub-window size (k)
    pub test_window: usize,
    /// Window width (w)
    pub window_width: usize,
    pub default_threshold: f64,
    pub threshold_floor: f64,
    /// Gaussian bandwidth of the default estimator
    pub kernel_bandwidth: f64,
    pub iterations: usize,
    /// Run `r` shuffles with `seed + r`
    pub seed: u64,
    pub shuffle: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reference_window: 50,
            test_window: 10,
            window_width: 50,
            default_threshold: 0.05,
            threshold_floor: 1e-9,
            kernel_bandwidth: 1.0,
            iterations: 50,
            seed: 0,
            shuffle: true,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("reference_window", self.reference_window),
            ("test_window", self.test_window),
            ("window_width", self.window_width),
            ("iterations", self.iterations),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }

        if !(self.kernel_bandwidth.is_finite() && self.kernel_bandwidth > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "kernel_bandwidth must be positive, got {}",
                self.kernel_bandwidth
            )));
        }
        for (name, value) in [
            ("default_threshold", self.default_threshold),
            ("threshold_floor", self.threshold_floor),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.reference_window, 50);
        assert_eq!(config.test_window, 10);
        assert_eq!(config.window_width, 50);
        assert!(config.shuffle);
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reference_window": 5, "iterations": 2, "seed": 42}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.reference_window, 5);
        assert_eq!(config.iterations, 2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_window, 10);
        assert_eq!(config.default_threshold, 0.05);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"window_width": 0}}"#).unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let bad = [
            Config { kernel_bandwidth: 0.0, ..Config::default() },
            Config { kernel_bandwidth: f64::NAN, ..Config::default() },
            Config { default_threshold: -1.0, ..Config::default() },
            Config { threshold_floor: f64::INFINITY, ..Config::default() },
            Config { iterations: 0, ..Config::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
