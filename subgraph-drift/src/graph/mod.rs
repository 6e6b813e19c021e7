//! Labeled graph records
//!
//! Discriminative subgraphs arrive as small directed graphs with labeled
//! nodes and optionally labeled edges. On the wire (JSON) a graph is a
//! record of two maps: node id to label, and `"src dst"` to edge label.
//! In memory the edges are kept as a list so the matcher can scan them
//! in their declared order.

pub mod listing;
pub mod matcher;

pub use matcher::GraphMatcher;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Malformed edge key {0:?}: expected \"<src> <dst>\"")]
    MalformedEdgeKey(String),
    #[error("Edge {from} -> {to} references undeclared node {node}")]
    UnknownNode {
        from: String,
        to: String,
        node: String,
    },
}

/// Wire form of a graph: `{nodes: {id: label}, edges: {"src dst": label}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    #[serde(default)]
    pub nodes: BTreeMap<String, String>,
    #[serde(default)]
    pub edges: BTreeMap<String, String>,
}

/// A directed, labeled edge. An empty label means "unlabeled".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
}

impl Edge {
    /// True when both edges join the same pair of nodes, in either direction.
    pub fn same_endpoints(&self, other: &Edge) -> bool {
        (self.from == other.from && self.to == other.to)
            || (self.from == other.to && self.to == other.from)
    }
}

/// Directed graph with labeled nodes and edges.
///
/// Node ids are unique. At most one edge exists per ordered `(from, to)`
/// pair; adding a second one replaces the label of the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct LabeledGraph {
    nodes: BTreeMap<String, String>,
    edges: Vec<Edge>,
}

impl LabeledGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, overwriting the label if the id already exists
    pub fn add_node(&mut self, id: impl Into<String>, label: impl Into<String>) {
        self.nodes.insert(id.into(), label.into());
    }

    /// Insert a directed edge between two declared nodes
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<(), GraphError> {
        let edge = Edge {
            from: from.into(),
            to: to.into(),
            label: label.into(),
        };

        for endpoint in [&edge.from, &edge.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::UnknownNode {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    node: endpoint.clone(),
                });
            }
        }

        match self
            .edges
            .iter_mut()
            .find(|e| e.from == edge.from && e.to == edge.to)
        {
            Some(existing) => existing.label = edge.label,
            None => self.edges.push(edge),
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate `(id, label)` pairs in id order
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().map(|(id, label)| (id.as_str(), label.as_str()))
    }

    pub fn node_label(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(String::as_str)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl TryFrom<GraphRecord> for LabeledGraph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        let mut graph = LabeledGraph {
            nodes: record.nodes,
            edges: Vec::new(),
        };

        for (key, label) in record.edges {
            let mut parts = key.split_whitespace();
            let (from, to) = match (parts.next(), parts.next(), parts.next()) {
                (Some(from), Some(to), None) => (from.to_string(), to.to_string()),
                _ => return Err(GraphError::MalformedEdgeKey(key)),
            };
            graph.add_edge(from, to, label)?;
        }

        Ok(graph)
    }
}

impl From<LabeledGraph> for GraphRecord {
    fn from(graph: LabeledGraph) -> Self {
        let edges = graph
            .edges
            .into_iter()
            .map(|e| (format!("{} {}", e.from, e.to), e.label))
            .collect();
        GraphRecord {
            nodes: graph.nodes,
            edges,
        }
    }
}

/// One discriminative subgraph reported for a stream item, with the number
/// of times the mining tool found it in that item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphCount {
    pub graph: LabeledGraph,
    pub count: u64,
}

impl SubgraphCount {
    pub fn new(graph: LabeledGraph, count: u64) -> Self {
        Self { graph, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip_keeps_edges() {
        let json = r#"{"nodes":{"1":"C","2":"O"},"edges":{"1 2":"double"}}"#;
        let graph: LabeledGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges()[0].label, "double");

        let back = serde_json::to_string(&graph).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_edges_default_to_empty() {
        let graph: LabeledGraph = serde_json::from_str(r#"{"nodes":{"1":"C"}}"#).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_malformed_edge_key_rejected() {
        let json = r#"{"nodes":{"1":"C"},"edges":{"1":""}}"#;
        let err = serde_json::from_str::<LabeledGraph>(json).unwrap_err();
        assert!(err.to_string().contains("Malformed edge key"));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut graph = LabeledGraph::new();
        graph.add_node("1", "C");
        let err = graph.add_edge("1", "9", "").unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownNode {
                from: "1".into(),
                to: "9".into(),
                node: "9".into(),
            }
        );
    }

    #[test]
    fn test_repeated_edge_replaces_label() {
        let mut graph = LabeledGraph::new();
        graph.add_node("1", "C");
        graph.add_node("2", "O");
        graph.add_edge("1", "2", "single").unwrap();
        graph.add_edge("1", "2", "double").unwrap();
        graph.add_edge("2", "1", "single").unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edges()[0].label, "double");
    }
}
