//! Core detection engine module

pub mod decision_engine;
pub mod detection_loop;
pub mod divergence;
pub mod oracle;
pub mod window_tracker;

pub use decision_engine::{DriftDecision, DriftDecisionEngine, DriftParams, Signal};
pub use detection_loop::{reorder_stream, DetectionRun, DriftDetectionLoop};
pub use divergence::{DivergenceEstimator, KernelMmdEstimator};
pub use oracle::{AcceptAllOracle, DriftOracle, KnownDriftOracle, OracleMode};
pub use window_tracker::SubgraphWindowTracker;
