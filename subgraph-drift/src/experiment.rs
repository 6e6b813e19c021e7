//! Repeated detection runs over one dataset

use crate::dataset::Dataset;
use crate::engine::detection_loop::{reorder_stream, DetectionRun, DriftDetectionLoop, LoopError};
use crate::engine::divergence::{EstimatorError, KernelMmdEstimator};
use crate::engine::oracle::{AcceptAllOracle, DriftOracle, KnownDriftOracle, OracleMode};
use crate::engine::{DriftDecisionEngine, DriftParams};
use crate::metrics::{MetricsSummary, RunMetrics};
use crate::{Config, ConfigError};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Estimator error: {0}")]
    EstimatorError(#[from] EstimatorError),
    #[error("Run {iteration} failed: {source}")]
    Detection {
        iteration: usize,
        #[source]
        source: LoopError,
    },
}

/// One run's outputs and scores
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub iteration: usize,
    pub seed: u64,
    pub metrics: RunMetrics,
    #[serde(flatten)]
    pub detection: DetectionRun,
}

/// Full record of an experiment
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub dataset: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: Config,
    pub oracle: OracleMode,
    pub runs: Vec<RunReport>,
    pub summary: MetricsSummary,
}

/// Build a fresh decision engine with the default estimator
pub fn build_engine(
    config: &Config,
    dataset: &Dataset,
    mode: OracleMode,
) -> Result<DriftDecisionEngine, ExperimentError> {
    let params = DriftParams::from(config);
    let estimator = KernelMmdEstimator::new(
        config.reference_window,
        config.test_window,
        config.kernel_bandwidth,
    )?;
    let oracle: Box<dyn DriftOracle> = match mode {
        OracleMode::GroundTruth => Box::new(KnownDriftOracle::new(
            dataset.drift_points().to_vec(),
            params.cooldown(),
        )),
        OracleMode::Unsupervised => Box::new(AcceptAllOracle),
    };
    Ok(DriftDecisionEngine::new(params, Box::new(estimator), oracle))
}

/// Item order for one run
pub fn stream_order(dataset: &Dataset, shuffle: bool, seed: u64) -> Vec<usize> {
    let ids = dataset.item_ids();
    if !shuffle {
        return ids;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    reorder_stream(&ids, dataset.first_drift_point(), &mut rng)
}

/// A single detection run with its own tracker and engine
pub fn run_once(
    dataset: &Dataset,
    config: &Config,
    mode: OracleMode,
    seed: u64,
) -> Result<DetectionRun, ExperimentError> {
    let engine = build_engine(config, dataset, mode)?;
    let order = stream_order(dataset, config.shuffle, seed);
    DriftDetectionLoop::new(engine)
        .run(dataset, &order)
        .map_err(|source| ExperimentError::Detection {
            iteration: 0,
            source,
        })
}

/// Run `config.iterations` independent detections and score them
pub fn run_experiment(
    dataset: &Dataset,
    config: &Config,
    mode: OracleMode,
) -> Result<ExperimentReport, ExperimentError> {
    config.validate()?;
    let started_at = Utc::now();
    let accepted_delay = DriftParams::from(config).cooldown();

    info!(
        "Starting experiment on {}: {} iterations, n={}, k={}, w={}",
        dataset.name(),
        config.iterations,
        config.reference_window,
        config.test_window,
        config.window_width
    );

    let mut runs = Vec::with_capacity(config.iterations);
    for iteration in 0..config.iterations {
        let seed = config.seed.wrapping_add(iteration as u64);
        let detection = run_once(dataset, config, mode, seed).map_err(|e| match e {
            ExperimentError::Detection { source, .. } => {
                ExperimentError::Detection { iteration, source }
            }
            other => other,
        })?;

        let metrics = RunMetrics::compute(
            &detection.drifts,
            &detection.false_alarms,
            dataset.drift_points(),
            detection.items,
            accepted_delay,
        );
        info!(
            "Run {}: drifts {:?}, {} false alarms, FA/1000 {:.3}, rate {:.3}, delay {:.2}",
            iteration,
            detection.drifts,
            detection.false_alarms.len(),
            metrics.false_alarms_per_1000,
            metrics.detection_rate,
            metrics.detection_delay
        );

        runs.push(RunReport {
            iteration,
            seed,
            metrics,
            detection,
        });

        if (iteration + 1) % 10 == 0 {
            let partial: Vec<RunMetrics> = runs.iter().map(|r| r.metrics).collect();
            let summary = MetricsSummary::aggregate(&partial);
            info!(
                "After {} runs: FA/1000 {:.3}, rate {:.3}, delay {:.2}",
                summary.runs,
                summary.false_alarms_per_1000.mean,
                summary.detection_rate.mean,
                summary.detection_delay.mean
            );
        }
    }

    let all: Vec<RunMetrics> = runs.iter().map(|r| r.metrics).collect();
    let summary = MetricsSummary::aggregate(&all);

    Ok(ExperimentReport {
        dataset: dataset.name().to_string(),
        started_at,
        finished_at: Utc::now(),
        config: config.clone(),
        oracle: mode,
        runs,
        summary,
    })
}
