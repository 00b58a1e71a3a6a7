// Shared fixtures for the unit tests: the tensor backend, seeded
// synthetic transaction graphs and a transport that records
// tracking requests instead of sending them.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};
use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use crate::domain::graph::{GraphData, Partition, PartitionKind, Partitions};
use crate::domain::traits::TrackingTransport;

pub type TestBackend = burn::backend::NdArray;

pub const NODE_DIM: usize = 3;
pub const EDGE_DIM: usize = 4;

/// A random graph; roughly a fifth of the edges are illicit.
pub fn synthetic_graph(num_nodes: usize, num_edges: usize, seed: u64) -> GraphData {
    let mut rng = StdRng::seed_from_u64(seed);
    let node_features = (0..num_nodes)
        .map(|_| (0..NODE_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let edges: Vec<(usize, usize)> = (0..num_edges)
        .map(|_| (rng.gen_range(0..num_nodes), rng.gen_range(0..num_nodes)))
        .collect();
    let edge_features = (0..num_edges)
        .map(|_| (0..EDGE_DIM).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();
    let labels = (0..num_edges).map(|_| u8::from(rng.gen_bool(0.2))).collect();

    GraphData { num_nodes, node_features, edges, edge_features, labels, edge_ids: None }
}

/// Three partitions; every other edge is a seed (at least 30 per partition).
pub fn synthetic_partitions(seed: u64) -> Partitions {
    let part = |kind, offset: u64| {
        let graph = synthetic_graph(40, 120, seed.wrapping_add(offset));
        let seeds = (0..graph.num_edges()).step_by(2).collect();
        Partition::new(kind, graph, seeds).unwrap()
    };
    Partitions {
        train: part(PartitionKind::Train, 0),
        val:   part(PartitionKind::Validation, 1),
        test:  part(PartitionKind::Test, 2),
    }
}

/// Write [`synthetic_partitions`] as `<dir>/<dataset>/{train,val,test}.json`.
pub fn write_partitions(dir: &Path, dataset: &str, seed: u64) {
    let parts = synthetic_partitions(seed);
    let root = dir.join(dataset);
    fs::create_dir_all(&root).unwrap();
    for p in [&parts.train, &parts.val, &parts.test] {
        let body = json!({
            "num_nodes":     p.graph.num_nodes,
            "node_features": p.graph.node_features,
            "edges":         p.graph.edges,
            "edge_features": p.graph.edge_features,
            "labels":        p.graph.labels,
            "seed_indices":  p.seed_indices,
        });
        fs::write(root.join(format!("{}.json", p.kind.file_stem())), body.to_string()).unwrap();
    }
}

// ─── RecordingTransport ───────────────────────────────────────────────────────

/// Records every request; answers run creation with a fixed id.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    fail:     bool,
}

impl RecordingTransport {
    /// A transport whose every request fails, as if the service were down.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }
}

impl TrackingTransport for RecordingTransport {
    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.requests.lock().unwrap().push((path.to_string(), body.clone()));
        if self.fail {
            bail!("connection refused");
        }
        Ok(json!({ "id": "run-1" }))
    }
}
