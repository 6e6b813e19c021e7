//! Subgraph matching
//!
//! Two discriminative subgraphs are treated as "the same pattern" when their
//! nodes agree on identity and label and their edges agree on label and
//! endpoints. Node ids are compared directly; there is no search over node
//! permutations.
//!
//! Edge endpoints are compared as unordered pairs even though the graphs are
//! directed, so `a -> b` and `b -> a` with the same label match each other.

use super::{Edge, LabeledGraph};

/// Decides whether two labeled graphs represent the same subgraph pattern
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphMatcher;

impl GraphMatcher {
    /// Same node count, and every node of `g1` exists in `g2` with the
    /// same id and label.
    pub fn node_match(g1: &LabeledGraph, g2: &LabeledGraph) -> bool {
        g1.node_count() == g2.node_count()
            && g1.nodes().all(|(id, label)| g2.node_label(id) == Some(label))
    }

    /// Same edge count, and every edge on either side has a counterpart on
    /// the other side with the same label and the same endpoint pair.
    pub fn edge_match(g1: &LabeledGraph, g2: &LabeledGraph) -> bool {
        g1.edge_count() == g2.edge_count()
            && covers(g1.edges(), g2.edges())
            && covers(g2.edges(), g1.edges())
    }

    /// Symmetric pattern equality used for bucketing
    pub fn is_isomorphic(g1: &LabeledGraph, g2: &LabeledGraph) -> bool {
        Self::node_match(g1, g2) && Self::edge_match(g1, g2)
    }
}

fn covers(edges: &[Edge], candidates: &[Edge]) -> bool {
    edges.iter().all(|e| {
        candidates
            .iter()
            .any(|c| c.label == e.label && c.same_endpoints(e))
    })
}
