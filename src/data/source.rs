// ============================================================
// Layer 4 — Partition Loader
// ============================================================
// Reads the three partitions of a dataset from JSON files:
//
//   <aml_data>/<dataset>/
//     train.json
//     val.json
//     test.json
//
// Each file holds one full graph plus its seed edges:
//   {
//     "num_nodes": 4,
//     "node_features": [[..], ..],        // num_nodes rows
//     "edges": [[src, dst], ..],
//     "edge_features": [[..], ..],        // one row per edge
//     "labels": [0, 1, ..],               // one label per edge
//     "seed_indices": [3, 4, ..]          // edges to evaluate
//   }
//
// Every table is validated on load so shape problems surface
// with the offending file name instead of deep inside a tensor op.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};

use crate::domain::graph::{GraphData, Partition, PartitionKind, Partitions};
use crate::domain::traits::GraphSource;

#[derive(Debug, Deserialize)]
struct PartitionFile {
    num_nodes:     usize,
    node_features: Vec<Vec<f32>>,
    edges:         Vec<(usize, usize)>,
    edge_features: Vec<Vec<f32>>,
    labels:        Vec<u8>,
    seed_indices:  Vec<usize>,
}

/// Loads partitions from a directory of JSON files.
pub struct JsonGraphSource {
    dir: PathBuf,
}

impl JsonGraphSource {
    /// `root` is the configured data directory, `dataset` the dataset name.
    pub fn new(root: impl AsRef<Path>, dataset: &str) -> Self {
        Self { dir: root.as_ref().join(dataset) }
    }

    fn load_partition(&self, kind: PartitionKind) -> Result<Partition> {
        let path = self.dir.join(format!("{}.json", kind.file_stem()));
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read partition '{}'", path.display()))?;
        let file: PartitionFile = serde_json::from_str(&json)
            .with_context(|| format!("Malformed partition '{}'", path.display()))?;

        let graph = GraphData {
            num_nodes:     file.num_nodes,
            node_features: file.node_features,
            edges:         file.edges,
            edge_features: file.edge_features,
            labels:        file.labels,
            edge_ids:      None,
        };
        let partition = Partition::new(kind, graph, file.seed_indices)
            .with_context(|| format!("Invalid partition '{}'", path.display()))?;

        tracing::debug!(
            "Loaded {}: {} nodes, {} edges, {} seeds",
            path.display(),
            partition.graph.num_nodes,
            partition.graph.num_edges(),
            partition.seed_indices.len()
        );
        Ok(partition)
    }
}

impl GraphSource for JsonGraphSource {
    fn load_partitions(&self) -> Result<Partitions> {
        Ok(Partitions {
            train: self.load_partition(PartitionKind::Train)?,
            val:   self.load_partition(PartitionKind::Validation)?,
            test:  self.load_partition(PartitionKind::Test)?,
        })
    }
}
