//! On-disk JSON layout for graph stream datasets
//!
//! ```json
//! {
//!   "name": "SD1",
//!   "drift_points": [1000],
//!   "items": [
//!     {"id": 1, "subgraphs": [
//!       {"count": 3, "graph": {"nodes": {"1": "C", "2": "O"}, "edges": {"1 2": "bond"}}}
//!     ]}
//!   ]
//! }
//! ```

use crate::graph::SubgraphCount;
use serde::{Deserialize, Serialize};

/// Dataset file version written by [`super::Dataset::to_json`]
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub name: String,
    /// Stream positions where the concept is known to change
    #[serde(default)]
    pub drift_points: Vec<usize>,
    pub items: Vec<ItemRecord>,
}

/// Pre-mined discriminative subgraphs of one stream item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: usize,
    #[serde(default)]
    pub subgraphs: Vec<SubgraphCount>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}
