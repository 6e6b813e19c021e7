//! Stream driver
//!
//! Walks a graph stream item by item, keeps the subgraph window current and
//! hands each window entropy to the decision engine.

use crate::dataset::Dataset;
use crate::engine::decision_engine::{DecisionError, DriftDecision, DriftDecisionEngine};
use crate::engine::window_tracker::SubgraphWindowTracker;
use crate::graph::SubgraphCount;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Decision error: {0}")]
    DecisionError(#[from] DecisionError),
    #[error("Stream item {0} is not in the dataset")]
    UnknownItem(usize),
}

/// Shuffle item ids within their drift regime.
///
/// Ids up to and including `first_drift` are permuted among themselves, as
/// are the ids after it; the two halves keep their relative position. With
/// no drift point the whole stream is one regime.
pub fn reorder_stream<R: Rng + ?Sized>(
    ids: &[usize],
    first_drift: Option<usize>,
    rng: &mut R,
) -> Vec<usize> {
    let (mut before, mut after): (Vec<usize>, Vec<usize>) = match first_drift {
        Some(drift) => ids.iter().partition(|&&id| id <= drift),
        None => (ids.to_vec(), Vec::new()),
    };
    before.shuffle(rng);
    after.shuffle(rng);
    before.extend(after);
    before
}

/// Everything one pass over the stream produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionRun {
    /// Divergence score per evaluation
    pub scores: Vec<f64>,
    /// Window entropy per stream position from `window_width` on
    pub entropy: Vec<f64>,
    /// Stream positions of confirmed drifts
    pub drifts: Vec<usize>,
    /// Every rejected threshold crossing
    pub warnings: Vec<usize>,
    /// Deduplicated rejected crossings
    pub false_alarms: Vec<usize>,
    /// Number of stream items consumed
    pub items: usize,
}

/// One detection run over a stream.
///
/// Owns its tracker and decision engine; both are discarded by [`finish`].
///
/// [`finish`]: DriftDetectionLoop::finish
pub struct DriftDetectionLoop {
    tracker: SubgraphWindowTracker,
    engine: DriftDecisionEngine,
    t: usize,
}

impl DriftDetectionLoop {
    pub fn new(engine: DriftDecisionEngine) -> Self {
        Self::with_tracker(SubgraphWindowTracker::new(), engine)
    }

    /// Reuse an existing tracker; its buckets are cleared first
    pub fn with_tracker(
        mut tracker: SubgraphWindowTracker,
        mut engine: DriftDecisionEngine,
    ) -> Self {
        tracker.clear();
        engine.reset();
        Self {
            tracker,
            engine,
            t: 0,
        }
    }

    /// Stream position of the last consumed item (0 before the first)
    pub fn position(&self) -> usize {
        self.t
    }

    pub fn tracker(&self) -> &SubgraphWindowTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &DriftDecisionEngine {
        &self.engine
    }

    /// Consume the next stream item's subgraph counts
    pub fn push(
        &mut self,
        subgraphs: &[SubgraphCount],
    ) -> Result<Option<DriftDecision>, LoopError> {
        self.t += 1;
        let t = self.t;
        let window_width = self.engine.params().window_width;

        self.tracker.expire(t, window_width);
        self.tracker.ingest(subgraphs, t);

        if t < window_width {
            return Ok(None);
        }

        let entropy = self.tracker.entropy();
        debug!(t, entropy, buckets = self.tracker.len(), "Window updated");
        Ok(self.engine.step(t, entropy)?)
    }

    /// Feed a whole stream of items, in order
    pub fn run_items<'a, I>(mut self, items: I) -> Result<DetectionRun, LoopError>
    where
        I: IntoIterator<Item = &'a [SubgraphCount]>,
    {
        for subgraphs in items {
            self.push(subgraphs)?;
        }
        Ok(self.finish())
    }

    /// Feed the dataset's items in the given id order
    pub fn run(mut self, dataset: &Dataset, order: &[usize]) -> Result<DetectionRun, LoopError> {
        for &id in order {
            let subgraphs = dataset.subgraphs(id).ok_or(LoopError::UnknownItem(id))?;
            self.push(subgraphs)?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> DetectionRun {
        let items = self.t;
        let (scores, entropy, alarms) = self.engine.into_traces();
        info!(
            "Detection finished after {} items: {} drifts, {} false alarms",
            items,
            alarms.drifts.len(),
            alarms.false_alarms.len()
        );
        DetectionRun {
            scores,
            entropy,
            drifts: alarms.drifts,
            warnings: alarms.warnings,
            false_alarms: alarms.false_alarms,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::decision_engine::DriftParams;
    use crate::engine::divergence::{EstimatorError, KernelMmdEstimator};
    use crate::engine::oracle::AcceptAllOracle;
    use crate::graph::LabeledGraph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params() -> DriftParams {
        DriftParams {
            reference_window: 2,
            test_window: 2,
            window_width: 4,
            default_threshold: 0.01,
            threshold_floor: 1e-9,
        }
    }

    fn engine() -> DriftDecisionEngine {
        let p = params();
        let estimator = KernelMmdEstimator::new(2, 2, 1.0).unwrap();
        DriftDecisionEngine::new(p, Box::new(estimator), Box::new(AcceptAllOracle))
    }

    fn single(id: &str, label: &str) -> Vec<SubgraphCount> {
        let mut g = LabeledGraph::new();
        g.add_node(id, label);
        vec![SubgraphCount::new(g, 1)]
    }

    #[test]
    fn test_reorder_keeps_regimes_apart() {
        let ids: Vec<usize> = (1..=20).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let order = reorder_stream(&ids, Some(8), &mut rng);

        let mut head = order[..8].to_vec();
        let mut tail = order[8..].to_vec();
        head.sort_unstable();
        tail.sort_unstable();
        assert_eq!(head, (1..=8).collect::<Vec<_>>());
        assert_eq!(tail, (9..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_reorder_is_deterministic_per_seed() {
        let ids: Vec<usize> = (1..=50).collect();
        let a = reorder_stream(&ids, Some(25), &mut ChaCha8Rng::seed_from_u64(3));
        let b = reorder_stream(&ids, Some(25), &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_reorder_without_drift_point() {
        let ids: Vec<usize> = (1..=10).collect();
        let mut order = reorder_stream(&ids, None, &mut ChaCha8Rng::seed_from_u64(1));
        order.sort_unstable();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_entropy_starts_at_window_width() {
        let mut detection = DriftDetectionLoop::new(engine());
        for _ in 0..3 {
            assert!(detection.push(&single("1", "A")).unwrap().is_none());
        }
        assert!(detection.engine().entropy_trace().is_empty());

        detection.push(&single("1", "A")).unwrap();
        assert_eq!(detection.position(), 4);
        assert_eq!(detection.engine().entropy_trace(), &[2.0]);
    }

    #[test]
    fn test_tracker_is_pruned_to_window() {
        let mut detection = DriftDetectionLoop::new(engine());
        for t in 1..=10 {
            detection.push(&single(&format!("n{t}"), "A")).unwrap();
        }
        // only the last 4 positions survive, each its own bucket
        assert_eq!(detection.tracker().len(), 4);
        assert!(detection.engine().entropy_trace().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_with_tracker_clears_buckets() {
        let mut tracker = SubgraphWindowTracker::new();
        tracker.ingest(&single("1", "A"), 1);
        let detection = DriftDetectionLoop::with_tracker(tracker, engine());
        assert!(detection.tracker().is_empty());
    }

    #[test]
    fn test_unknown_item_aborts_run() {
        let dataset = Dataset::new("d", vec![], vec![(1, single("1", "A"))]).unwrap();
        let err = DriftDetectionLoop::new(engine())
            .run(&dataset, &[1, 2])
            .unwrap_err();
        assert!(matches!(err, LoopError::UnknownItem(2)));
    }

    #[test]
    fn test_estimator_failure_aborts_run() {
        let estimator = |_: &[f64]| -> Result<f64, EstimatorError> {
            Err(EstimatorError::Failed("ill-conditioned".into()))
        };
        let engine =
            DriftDecisionEngine::new(params(), Box::new(estimator), Box::new(AcceptAllOracle));
        let items: Vec<Vec<SubgraphCount>> = (0..12).map(|_| single("1", "A")).collect();

        let err = DriftDetectionLoop::new(engine)
            .run_items(items.iter().map(Vec::as_slice))
            .unwrap_err();
        assert!(matches!(
            err,
            LoopError::DecisionError(DecisionError::Estimator { t: 9, .. })
        ));
    }

    #[test]
    fn test_finish_collects_traces() {
        let items: Vec<Vec<SubgraphCount>> = (0..12).map(|_| single("1", "A")).collect();
        let run = DriftDetectionLoop::new(engine())
            .run_items(items.iter().map(Vec::as_slice))
            .unwrap();

        assert_eq!(run.items, 12);
        assert_eq!(run.entropy.len(), 9);
        // evaluations at t = 9..=12
        assert_eq!(run.scores.len(), 4);
        assert!(run.drifts.is_empty());
        assert!(run.false_alarms.is_empty());
    }
}
