// ============================================================
// Layer 3 — Graph Domain Types
// ============================================================
// A transaction graph: accounts are nodes, transactions are
// directed edges carrying features and a binary label
// (0 = licit, 1 = illicit).
//
// Each partition (train / validation / test) owns a full graph
// plus the ordered indices of its "seed" edges — the edges whose
// predictions are actually evaluated. The other edges only serve
// as neighbourhood context for message passing.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Edge relation types. Homogeneous graphs use only `To`; the
/// reverse-message-passing view adds `RevTo` (every edge flipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    To,
    RevTo,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::To    => "to",
            Relation::RevTo => "rev_to",
        }
    }
}

/// Relation types of a graph view; the node type is always a single `node`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphMetadata {
    pub relations: Vec<Relation>,
}

/// One directed, attributed transaction graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    pub num_nodes:     usize,
    /// One row per node
    pub node_features: Vec<Vec<f32>>,
    /// `(src, dst)` per edge
    pub edges:         Vec<(usize, usize)>,
    /// One row per edge
    pub edge_features: Vec<Vec<f32>>,
    /// One label per edge
    pub labels:        Vec<u8>,
    /// Dense ids assigned by [`add_arange_ids`]; `None` until then
    #[serde(skip)]
    pub edge_ids:      Option<Vec<usize>>,
}

impl GraphData {
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn node_feature_dim(&self) -> usize {
        self.node_features.first().map_or(0, Vec::len)
    }

    pub fn edge_feature_dim(&self) -> usize {
        self.edge_features.first().map_or(0, Vec::len)
    }

    /// Id of edge `index`; the positional index when ids were never assigned.
    pub fn edge_id(&self, index: usize) -> usize {
        self.edge_ids.as_ref().map_or(index, |ids| ids[index])
    }

    /// Metadata of the reverse-message-passing view.
    pub fn hetero_metadata(&self) -> GraphMetadata {
        GraphMetadata { relations: vec![Relation::To, Relation::RevTo] }
    }

    /// Mean of `ln(in_degree + 1)` over all nodes.
    /// PNA uses it to normalise its degree scalers.
    pub fn avg_log_degree(&self) -> f64 {
        if self.num_nodes == 0 {
            return 1.0;
        }
        let mut in_degree = vec![0usize; self.num_nodes];
        for &(_, dst) in &self.edges {
            in_degree[dst] += 1;
        }
        let total: f64 = in_degree
            .iter()
            .map(|&d| (d.max(1) as f64 + 1.0).ln())
            .sum();
        total / self.num_nodes as f64
    }

    /// Check that every table agrees with `num_nodes` / the edge count
    /// and that all rows of a feature table have the same width.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.node_features.len() == self.num_nodes,
            "expected {} node feature rows, found {}",
            self.num_nodes,
            self.node_features.len()
        );
        ensure!(
            self.edge_features.len() == self.num_edges(),
            "expected {} edge feature rows, found {}",
            self.num_edges(),
            self.edge_features.len()
        );
        ensure!(
            self.labels.len() == self.num_edges(),
            "expected {} edge labels, found {}",
            self.num_edges(),
            self.labels.len()
        );

        let node_dim = self.node_feature_dim();
        let edge_dim = self.edge_feature_dim();
        ensure!(node_dim > 0, "node features must have at least one column");
        ensure!(edge_dim > 0 || self.edges.is_empty(), "edge features must have at least one column");
        ensure!(
            self.node_features.iter().all(|row| row.len() == node_dim),
            "node feature rows have inconsistent widths"
        );
        ensure!(
            self.edge_features.iter().all(|row| row.len() == edge_dim),
            "edge feature rows have inconsistent widths"
        );

        if let Some(pos) = self
            .edges
            .iter()
            .position(|&(s, d)| s >= self.num_nodes || d >= self.num_nodes)
        {
            anyhow::bail!(
                "edge {} references a node outside 0..{}",
                pos,
                self.num_nodes
            );
        }
        if let Some(pos) = self.labels.iter().position(|&l| l > 1) {
            anyhow::bail!("edge {} has label {}, expected 0 or 1", pos, self.labels[pos]);
        }
        Ok(())
    }
}

// ─── Partitions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Train,
    Validation,
    Test,
}

impl PartitionKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            PartitionKind::Train      => "train",
            PartitionKind::Validation => "val",
            PartitionKind::Test       => "test",
        }
    }
}

/// A graph plus the ordered seed edges evaluated on it.
#[derive(Debug, Clone)]
pub struct Partition {
    pub kind:         PartitionKind,
    pub graph:        GraphData,
    pub seed_indices: Vec<usize>,
}

impl Partition {
    pub fn new(kind: PartitionKind, graph: GraphData, seed_indices: Vec<usize>) -> Result<Self> {
        graph.validate()?;
        if let Some(&bad) = seed_indices.iter().find(|&&i| i >= graph.num_edges()) {
            anyhow::bail!(
                "{} seed index {} is out of range for {} edges",
                kind.file_stem(),
                bad,
                graph.num_edges()
            );
        }
        Ok(Self { kind, graph, seed_indices })
    }
}

#[derive(Debug, Clone)]
pub struct Partitions {
    pub train: Partition,
    pub val:   Partition,
    pub test:  Partition,
}

/// Give every edge of every graph a dense id `0..num_edges`.
///
/// The ids travel with sampled edges so predictions can be matched
/// back to seed edges. Calling it again simply reassigns the same ids.
pub fn add_arange_ids(graphs: &mut [&mut GraphData]) {
    for graph in graphs.iter_mut() {
        graph.edge_ids = Some((0..graph.num_edges()).collect());
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_graph() -> GraphData {
        GraphData {
            num_nodes:     3,
            node_features: vec![vec![1.0], vec![2.0], vec![3.0]],
            edges:         vec![(0, 1), (1, 2), (2, 0), (0, 2)],
            edge_features: vec![vec![0.5, 1.0]; 4],
            labels:        vec![0, 1, 0, 0],
            edge_ids:      None,
        }
    }

    #[test]
    fn test_arange_ids_are_dense_and_repeatable() {
        let mut a = tiny_graph();
        let mut b = tiny_graph();
        b.edges.pop();
        b.edge_features.pop();
        b.labels.pop();

        add_arange_ids(&mut [&mut a, &mut b]);
        assert_eq!(a.edge_ids, Some(vec![0, 1, 2, 3]));
        assert_eq!(b.edge_ids, Some(vec![0, 1, 2]));

        add_arange_ids(&mut [&mut a]);
        assert_eq!(a.edge_ids, Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn test_edge_id_falls_back_to_position() {
        let g = tiny_graph();
        assert_eq!(g.edge_id(2), 2);
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let mut g = tiny_graph();
        g.edges[1] = (1, 7);
        let err = g.validate().unwrap_err();
        assert!(err.to_string().contains("edge 1"));
    }

    #[test]
    fn test_validate_rejects_non_binary_label() {
        let mut g = tiny_graph();
        g.labels[3] = 2;
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_partition_rejects_out_of_range_seed() {
        let err = Partition::new(PartitionKind::Test, tiny_graph(), vec![0, 4]).unwrap_err();
        assert!(err.to_string().contains("seed index 4"));
    }

    #[test]
    fn test_hetero_metadata_adds_reverse_relation() {
        let g = tiny_graph();
        assert_eq!(g.hetero_metadata().relations, vec![Relation::To, Relation::RevTo]);
    }

    #[test]
    fn test_avg_log_degree() {
        // in-degrees: node0 = 1, node1 = 1, node2 = 2
        let g = tiny_graph();
        let expected = (2.0f64.ln() * 2.0 + 3.0f64.ln()) / 3.0;
        assert!((g.avg_log_degree() - expected).abs() < 1e-12);
    }
}
