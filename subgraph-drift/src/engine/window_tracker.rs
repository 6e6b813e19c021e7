//! Subgraph window tracking
//!
//! Groups the discriminative subgraphs seen over the last `window_width`
//! stream positions into buckets of matching patterns and measures how
//! evenly each recurring pattern's occurrences are spread across the window.

use crate::graph::{GraphMatcher, LabeledGraph, SubgraphCount};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Opaque, monotonically assigned bucket identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketId(u64);

impl BucketId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Occurrence count of a pattern at one stream position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub count: u64,
    pub timestamp: usize,
}

/// All recent occurrences of one subgraph pattern
#[derive(Debug, Clone)]
pub struct SubgraphBucket {
    id: BucketId,
    representative: LabeledGraph,
    observations: Vec<Observation>,
}

impl SubgraphBucket {
    pub fn id(&self) -> BucketId {
        self.id
    }

    pub fn representative(&self) -> &LabeledGraph {
        &self.representative
    }

    /// Observations in append order; timestamps strictly increase
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// A pattern seen at only one position in the window
    pub fn is_novel(&self) -> bool {
        self.observations.len() <= 1
    }

    pub fn total_count(&self) -> u64 {
        self.observations.iter().map(|o| o.count).sum()
    }

    /// Shannon entropy (bits) of this bucket's count distribution over time
    pub fn internal_entropy(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;

        self.observations
            .iter()
            .filter(|o| o.count > 0)
            .map(|o| {
                let p = o.count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Several matches from the same stream item fold into one observation
    /// with their counts summed, so a pattern repeated within a single item
    /// is still novel until it shows up at a second position.
    fn record(&mut self, count: u64, timestamp: usize) {
        match self.observations.last_mut() {
            Some(last) if last.timestamp == timestamp => last.count += count,
            _ => self.observations.push(Observation { count, timestamp }),
        }
    }
}

/// Bucket table over a sliding window of stream positions.
///
/// Buckets are kept in creation order, which is also the order incoming
/// subgraphs are matched against them.
#[derive(Debug, Default)]
pub struct SubgraphWindowTracker {
    buckets: Vec<SubgraphBucket>,
    next_id: u64,
}

impl SubgraphWindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop observations at least `window_width` positions old, and any
    /// bucket left without observations.
    pub fn expire(&mut self, current_time: usize, window_width: usize) {
        for bucket in &mut self.buckets {
            bucket
                .observations
                .retain(|o| current_time.saturating_sub(o.timestamp) < window_width);
        }
        self.buckets.retain(|b| !b.observations.is_empty());
    }

    /// Record one stream item's subgraph counts at `current_time`.
    ///
    /// Each subgraph joins the first bucket (by creation order) whose
    /// representative it matches; otherwise it starts a new bucket.
    pub fn ingest(&mut self, subgraphs: &[SubgraphCount], current_time: usize) {
        for subgraph in subgraphs {
            let existing = self
                .buckets
                .iter_mut()
                .find(|b| GraphMatcher::is_isomorphic(&subgraph.graph, &b.representative));

            match existing {
                Some(bucket) => bucket.record(subgraph.count, current_time),
                None => {
                    self.next_id += 1;
                    let id = BucketId(self.next_id);
                    trace!("New subgraph bucket {} at t={}", id, current_time);
                    self.buckets.push(SubgraphBucket {
                        id,
                        representative: subgraph.graph.clone(),
                        observations: vec![Observation {
                            count: subgraph.count,
                            timestamp: current_time,
                        }],
                    });
                }
            }
        }
    }

    /// Window entropy: the count-weighted mean of the recurring buckets'
    /// internal entropies. Novel buckets are ignored; an empty or all-novel
    /// window has entropy 0.
    pub fn entropy(&self) -> f64 {
        let recurring = || self.buckets.iter().filter(|b| !b.is_novel());

        let total: u64 = recurring().map(SubgraphBucket::total_count).sum();
        if total == 0 {
            return 0.0;
        }
        let total = total as f64;

        recurring()
            .map(|b| (b.total_count() as f64 / total) * b.internal_entropy())
            .sum()
    }

    pub fn buckets(&self) -> &[SubgraphBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Forget every bucket; identifiers restart from the beginning
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.next_id = 0;
    }
}
