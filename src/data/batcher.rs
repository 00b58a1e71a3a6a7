// ============================================================
// Layer 4 — Link Neighbour Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec of seed edge indices in,
// one tensorised subgraph out.
//
// How a batch is built:
//   1. Derive a per-batch RNG from the run seed and the seed ids
//      (same seeds + same run seed → same neighbourhood)
//   2. Sample the neighbourhood with NeighborSampler
//   3. Gather node / edge feature rows in local order
//   4. Apply the run's Transform (e.g. ego ids)
//   5. Flatten and reshape into tensors:
//        x          [nodes, node_dim]
//        src, dst   [edges]        (local node ids)
//        edge_attr  [edges, edge_dim]
//        seed_positions [seeds]   (rows of the seed edges)
//
// Labels and edge ids of the seeds stay on the host; evaluation
// only needs them for counting, never inside the model.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;

use crate::data::{sampler::{NeighborSampler, Subgraph}, transform::Transform};
use crate::domain::graph::{GraphData, Relation};

// ─── Batch types ──────────────────────────────────────────────────────────────

/// One edge relation of a batch: endpoints plus edge features.
#[derive(Debug, Clone)]
pub struct RelationInput<B: Backend> {
    pub src:       Tensor<B, 1, Int>,
    pub dst:       Tensor<B, 1, Int>,
    pub edge_attr: Tensor<B, 2>,
}

/// A sampled subgraph around a mini-batch of seed edges.
#[derive(Debug, Clone)]
pub struct GraphBatch<B: Backend> {
    pub x:              Tensor<B, 2>,
    pub src:            Tensor<B, 1, Int>,
    pub dst:            Tensor<B, 1, Int>,
    pub edge_attr:      Tensor<B, 2>,
    pub seed_positions: Tensor<B, 1, Int>,
    pub labels:         Vec<u8>,
    pub seed_edge_ids:  Vec<usize>,
    pub num_nodes:      usize,
}

impl<B: Backend> GraphBatch<B> {
    pub fn node_dim(&self) -> usize { self.x.dims()[1] }

    pub fn edge_dim(&self) -> usize { self.edge_attr.dims()[1] }

    pub fn num_seeds(&self) -> usize { self.labels.len() }

    /// The batch seen through one relation; `RevTo` flips every edge.
    pub fn relation(&self, relation: Relation) -> RelationInput<B> {
        let (src, dst) = match relation {
            Relation::To    => (self.src.clone(), self.dst.clone()),
            Relation::RevTo => (self.dst.clone(), self.src.clone()),
        };
        RelationInput { src, dst, edge_attr: self.edge_attr.clone() }
    }
}

// ─── LinkNeighborBatcher ──────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct LinkNeighborBatcher<B: Backend> {
    graph:     Arc<GraphData>,
    sampler:   Arc<NeighborSampler>,
    transform: Transform,
    seed:      u64,
    device:    B::Device,
}

impl<B: Backend> LinkNeighborBatcher<B> {
    pub fn new(
        graph:     Arc<GraphData>,
        fanout:    Vec<usize>,
        transform: Transform,
        seed:      u64,
        device:    B::Device,
    ) -> Self {
        let sampler = Arc::new(NeighborSampler::new(&graph, fanout));
        Self { graph, sampler, transform, seed, device }
    }

    fn tensorize(&self, sub: &Subgraph) -> GraphBatch<B> {
        let graph     = &self.graph;
        let num_nodes = sub.nodes.len();
        let num_edges = sub.edges.len();

        // ── Node features (+ transform columns) ──────────────────────────────
        let mut rows: Vec<Vec<f32>> = sub
            .nodes
            .iter()
            .map(|&n| graph.node_features[n].clone())
            .collect();
        self.transform.apply(&mut rows, sub.seed_nodes());
        let node_dim = graph.node_feature_dim() + self.transform.extra_node_features();
        let x_flat: Vec<f32> = rows.into_iter().flatten().collect();

        // ── Edge features in subgraph order ──────────────────────────────────
        let edge_dim = graph.edge_feature_dim();
        let e_flat: Vec<f32> = sub
            .edges
            .iter()
            .flat_map(|&e| graph.edge_features[e].iter().copied())
            .collect();

        let src: Vec<i32> = sub.local.iter().map(|&(s, _)| s as i32).collect();
        let dst: Vec<i32> = sub.local.iter().map(|&(_, d)| d as i32).collect();
        let seed_positions: Vec<i32> = (0..sub.num_seeds as i32).collect();

        let seeds = &sub.edges[..sub.num_seeds];
        let labels        = seeds.iter().map(|&e| graph.labels[e]).collect();
        let seed_edge_ids = seeds.iter().map(|&e| graph.edge_id(e)).collect();

        GraphBatch {
            x: Tensor::<B, 1>::from_floats(x_flat.as_slice(), &self.device)
                .reshape([num_nodes, node_dim]),
            src: Tensor::<B, 1, Int>::from_ints(src.as_slice(), &self.device),
            dst: Tensor::<B, 1, Int>::from_ints(dst.as_slice(), &self.device),
            edge_attr: Tensor::<B, 1>::from_floats(e_flat.as_slice(), &self.device)
                .reshape([num_edges, edge_dim]),
            seed_positions: Tensor::<B, 1, Int>::from_ints(seed_positions.as_slice(), &self.device),
            labels,
            seed_edge_ids,
            num_nodes,
        }
    }
}

impl<B: Backend> Batcher<usize, GraphBatch<B>> for LinkNeighborBatcher<B> {
    fn batch(&self, items: Vec<usize>) -> GraphBatch<B> {
        let mut rng = StdRng::seed_from_u64(batch_seed(self.seed, &items));
        let sub = self.sampler.sample(&self.graph, &items, &mut rng);
        self.tensorize(&sub)
    }
}

/// FNV-1a over the seed ids, mixed with the run seed.
fn batch_seed(run_seed: u64, items: &[usize]) -> u64 {
    items.iter().fold(0xcbf2_9ce4_8422_2325 ^ run_seed, |h, &i| {
        (h ^ i as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::add_arange_ids;
    use crate::testing::{synthetic_graph, TestBackend};

    fn batcher(transform: Transform) -> (Arc<GraphData>, LinkNeighborBatcher<TestBackend>) {
        let mut graph = synthetic_graph(30, 90, 5);
        add_arange_ids(&mut [&mut graph]);
        let graph = Arc::new(graph);
        let b = LinkNeighborBatcher::new(graph.clone(), vec![4, 2], transform, 1, Default::default());
        (graph, b)
    }

    #[test]
    fn test_batch_shapes() {
        let (graph, b) = batcher(Transform::Identity);
        let batch = b.batch(vec![0, 5, 17]);
        let [n, f] = batch.x.dims();
        assert_eq!(n, batch.num_nodes);
        assert_eq!(f, graph.node_feature_dim());
        assert_eq!(batch.edge_dim(), graph.edge_feature_dim());
        assert_eq!(batch.src.dims()[0], batch.edge_attr.dims()[0]);
        assert_eq!(batch.num_seeds(), 3);
        assert_eq!(batch.seed_edge_ids, vec![0, 5, 17]);
        assert_eq!(batch.labels, vec![graph.labels[0], graph.labels[5], graph.labels[17]]);
    }

    #[test]
    fn test_ego_ids_widen_node_features() {
        let (graph, b) = batcher(Transform::AddEgoIds);
        let batch = b.batch(vec![3]);
        assert_eq!(batch.node_dim(), graph.node_feature_dim() + 1);

        // Exactly the seed endpoints carry the flag
        let flags: Vec<f32> = batch
            .x
            .clone()
            .slice([0..batch.num_nodes, graph.node_feature_dim()..batch.node_dim()])
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let (s, d) = graph.edges[3];
        let expected = if s == d { 1.0 } else { 2.0 };
        assert_eq!(flags.iter().sum::<f32>(), expected);
    }

    #[test]
    fn test_same_seeds_same_batch() {
        let (_, b) = batcher(Transform::Identity);
        let a = b.batch(vec![1, 2, 3]);
        let c = b.batch(vec![1, 2, 3]);
        assert_eq!(a.num_nodes, c.num_nodes);
        assert_eq!(
            a.src.into_data().convert::<i64>().to_vec::<i64>().unwrap(),
            c.src.into_data().convert::<i64>().to_vec::<i64>().unwrap()
        );
    }

    #[test]
    fn test_reverse_relation_swaps_endpoints() {
        let (_, b) = batcher(Transform::Identity);
        let batch = b.batch(vec![8]);
        let rev = batch.relation(Relation::RevTo);
        assert_eq!(
            rev.src.into_data().convert::<i64>().to_vec::<i64>().unwrap(),
            batch.dst.clone().into_data().convert::<i64>().to_vec::<i64>().unwrap()
        );
    }
}
