//! Graph stream datasets
//!
//! A dataset is a sequence of stream items, each carrying the discriminative
//! subgraphs (with occurrence counts) that the external mining tool found in
//! that item, plus the stream positions of known concept drifts.

pub mod schema;

use crate::graph::listing::{parse_stream_listing, ListingError};
use crate::graph::SubgraphCount;
use schema::{DatasetFile, ItemRecord, SCHEMA_VERSION};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Listing error: {0}")]
    ListingError(#[from] ListingError),
    #[error("Unsupported dataset version {0}")]
    UnsupportedVersion(String),
    #[error("Duplicate stream item id {0}")]
    DuplicateItem(usize),
    #[error("Dataset {0:?} has no stream items")]
    Empty(String),
}

/// Input file layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DatasetFormat {
    /// JSON dataset file
    Json,
    /// `XP # <id>` sections of mining-tool subgraph listings
    Listing,
}

impl DatasetFormat {
    /// Guess from the file extension: `.json` is JSON, anything else a listing
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DatasetFormat::Json,
            _ => DatasetFormat::Listing,
        }
    }
}

/// Summary figures for a loaded dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
    pub items: usize,
    pub subgraph_entries: usize,
    pub subgraph_instances: u64,
    pub drift_points: Vec<usize>,
}

/// A stream of items keyed by id, with known drift positions
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    drift_points: Vec<usize>,
    items: BTreeMap<usize, Vec<SubgraphCount>>,
}

impl Dataset {
    /// Build a dataset from `(id, subgraphs)` pairs
    pub fn new(
        name: impl Into<String>,
        drift_points: Vec<usize>,
        items: impl IntoIterator<Item = (usize, Vec<SubgraphCount>)>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        let mut table = BTreeMap::new();
        for (id, subgraphs) in items {
            if table.insert(id, subgraphs).is_some() {
                return Err(DatasetError::DuplicateItem(id));
            }
        }
        if table.is_empty() {
            return Err(DatasetError::Empty(name));
        }

        let mut drift_points = drift_points;
        drift_points.sort_unstable();
        drift_points.dedup();

        Ok(Self {
            name,
            drift_points,
            items: table,
        })
    }

    /// Load a dataset file.
    ///
    /// Listing files carry neither a name nor drift points; the file stem
    /// and `drift_points` are used instead. For JSON files a non-empty
    /// `drift_points` overrides the file's own.
    pub fn load(
        path: &Path,
        format: DatasetFormat,
        drift_points: Vec<usize>,
    ) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path)?;
        let dataset = match format {
            DatasetFormat::Json => {
                let mut dataset = Self::from_json_str(&text)?;
                if !drift_points.is_empty() {
                    dataset = Self::new(dataset.name, drift_points, dataset.items)?;
                }
                dataset
            }
            DatasetFormat::Listing => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "dataset".to_string());
                Self::from_listing_str(name, &text, drift_points)?
            }
        };

        info!(
            "Loaded dataset {} from {}: {} items, drift points {:?}",
            dataset.name,
            path.display(),
            dataset.len(),
            dataset.drift_points
        );
        Ok(dataset)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DatasetError> {
        let file: DatasetFile = serde_json::from_str(text)?;
        if !file.version.starts_with("1.") {
            return Err(DatasetError::UnsupportedVersion(file.version));
        }
        Self::new(
            file.name,
            file.drift_points,
            file.items.into_iter().map(|item| (item.id, item.subgraphs)),
        )
    }

    pub fn from_listing_str(
        name: impl Into<String>,
        text: &str,
        drift_points: Vec<usize>,
    ) -> Result<Self, DatasetError> {
        let items = parse_stream_listing(text)?;
        Self::new(
            name,
            drift_points,
            items.into_iter().map(|item| (item.id, item.subgraphs)),
        )
    }

    /// Serialize in the JSON dataset layout
    pub fn to_json(&self) -> Result<String, DatasetError> {
        let file = DatasetFile {
            version: SCHEMA_VERSION.to_string(),
            name: self.name.clone(),
            drift_points: self.drift_points.clone(),
            items: self
                .items
                .iter()
                .map(|(&id, subgraphs)| ItemRecord {
                    id,
                    subgraphs: subgraphs.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Known drift positions, ascending
    pub fn drift_points(&self) -> &[usize] {
        &self.drift_points
    }

    pub fn first_drift_point(&self) -> Option<usize> {
        self.drift_points.first().copied()
    }

    /// Item ids in ascending order
    pub fn item_ids(&self) -> Vec<usize> {
        self.items.keys().copied().collect()
    }

    pub fn subgraphs(&self, id: usize) -> Option<&[SubgraphCount]> {
        self.items.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            items: self.items.len(),
            subgraph_entries: self.items.values().map(Vec::len).sum(),
            subgraph_instances: self
                .items
                .values()
                .flat_map(|s| s.iter().map(|c| c.count))
                .sum(),
            drift_points: self.drift_points.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON: &str = r#"{
        "name": "tiny",
        "drift_points": [2],
        "items": [
            {"id": 2, "subgraphs": [{"count": 1, "graph": {"nodes": {"1": "B"}}}]},
            {"id": 1, "subgraphs": [
                {"count": 3, "graph": {"nodes": {"1": "A", "2": "B"}, "edges": {"1 2": ""}}},
                {"count": 2, "graph": {"nodes": {"1": "B"}}}
            ]},
            {"id": 3}
        ]
    }"#;

    #[test]
    fn test_from_json() {
        let dataset = Dataset::from_json_str(JSON).unwrap();
        assert_eq!(dataset.name(), "tiny");
        assert_eq!(dataset.item_ids(), vec![1, 2, 3]);
        assert_eq!(dataset.first_drift_point(), Some(2));
        assert_eq!(dataset.subgraphs(1).unwrap().len(), 2);
        assert!(dataset.subgraphs(3).unwrap().is_empty());
        assert!(dataset.subgraphs(4).is_none());

        let stats = dataset.stats();
        assert_eq!(stats.subgraph_entries, 3);
        assert_eq!(stats.subgraph_instances, 6);
    }

    #[test]
    fn test_json_round_trip() {
        let dataset = Dataset::from_json_str(JSON).unwrap();
        let again = Dataset::from_json_str(&dataset.to_json().unwrap()).unwrap();
        assert_eq!(again.stats(), dataset.stats());
        assert_eq!(again.subgraphs(1), dataset.subgraphs(1));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let err = Dataset::new("d", vec![], vec![(1, vec![]), (1, vec![])]).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateItem(1)));

        let err = Dataset::new("d", vec![], Vec::new()).unwrap_err();
        assert!(matches!(err, DatasetError::Empty(_)));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = Dataset::from_json_str(r#"{"version":"2.0","name":"x","items":[]}"#).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedVersion(_)));
    }

    #[test]
    fn test_drift_points_sorted_and_deduplicated() {
        let dataset = Dataset::new("d", vec![30, 10, 30], vec![(1, vec![])]).unwrap();
        assert_eq!(dataset.drift_points(), &[10, 30]);
    }

    #[test]
    fn test_load_listing_file() {
        let mut file = tempfile::Builder::new().suffix(".g").tempfile().unwrap();
        write!(file, "XP # 1\nS 2\nv 1 \"A\"\n\nXN # 2\nS 1\nv 1 \"B\"\n").unwrap();

        let path = file.path();
        assert_eq!(DatasetFormat::from_path(path), DatasetFormat::Listing);
        let dataset = Dataset::load(path, DatasetFormat::Listing, vec![2]).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.drift_points(), &[2]);
    }

    #[test]
    fn test_load_json_with_override() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();

        let path = file.path();
        assert_eq!(DatasetFormat::from_path(path), DatasetFormat::Json);
        let dataset = Dataset::load(path, DatasetFormat::Json, vec![3]).unwrap();
        assert_eq!(dataset.drift_points(), &[3]);
        assert_eq!(dataset.name(), "tiny");
    }
}
