// ============================================================
// Layer 4 — Partition Data Loaders
// ============================================================
// Wraps each partition in a Burn DataLoader:
//
//   SeedDataset (seed edge indices)
//       │   batch_size seeds at a time
//       ▼
//   LinkNeighborBatcher → GraphBatch
//
// The training loader shuffles with the run seed; validation and
// test loaders keep the seed order of the partition so repeated
// evaluations see identical batches. No worker threads are
// spawned — batches are produced on the calling thread.
//
// Edge ids must have been assigned (add_arange_ids) beforehand;
// they are how a prediction is traced back to its seed edge.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::{ensure, Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};
use std::sync::Arc;

use crate::data::{
    batcher::{GraphBatch, LinkNeighborBatcher},
    dataset::SeedDataset,
    transform::Transform,
};
use crate::domain::graph::{Partition, PartitionKind, Partitions};

/// Loader settings shared by all three partitions.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub batch_size:    usize,
    /// Neighbours sampled per node, one entry per hop
    pub num_neighbors: Vec<usize>,
    pub seed:          u64,
}

/// One partition's batch iterator and the ids of the seed edges it yields.
pub struct PartitionLoader<B: Backend> {
    pub kind:       PartitionKind,
    pub seed_count: usize,
    /// Edge id of every seed, in partition order
    pub seed_ids:   Vec<usize>,
    pub loader:     Arc<dyn DataLoader<GraphBatch<B>>>,
}

impl<B: Backend> PartitionLoader<B> {
    /// The first batch of this loader; fails on an empty partition.
    pub fn first_batch(&self) -> Result<GraphBatch<B>> {
        self.loader
            .iter()
            .next()
            .with_context(|| format!("{} partition produced no batches", self.kind.file_stem()))
    }
}

pub struct Loaders<B: Backend> {
    pub train: PartitionLoader<B>,
    pub val:   PartitionLoader<B>,
    pub test:  PartitionLoader<B>,
}

/// Build the train / validation / test loaders.
pub fn get_loaders<B: Backend>(
    partitions: Partitions,
    transform:  Transform,
    cfg:        &LoaderConfig,
    device:     &B::Device,
) -> Result<Loaders<B>> {
    ensure!(cfg.batch_size > 0, "batch size must be positive");

    let loaders = Loaders {
        train: partition_loader(partitions.train, true,  transform, cfg, device)?,
        val:   partition_loader(partitions.val,   false, transform, cfg, device)?,
        test:  partition_loader(partitions.test,  false, transform, cfg, device)?,
    };

    tracing::info!(
        "Loaders ready: {} train / {} val / {} test seeds, batch_size={}, num_neighbors={:?}",
        loaders.train.seed_count,
        loaders.val.seed_count,
        loaders.test.seed_count,
        cfg.batch_size,
        cfg.num_neighbors,
    );
    Ok(loaders)
}

fn partition_loader<B: Backend>(
    partition: Partition,
    shuffle:   bool,
    transform: Transform,
    cfg:       &LoaderConfig,
    device:    &B::Device,
) -> Result<PartitionLoader<B>> {
    ensure!(
        partition.graph.edge_ids.is_some(),
        "{} partition has no edge ids; assign them before building loaders",
        partition.kind.file_stem()
    );

    let graph    = Arc::new(partition.graph);
    let seed_ids = partition.seed_indices.iter().map(|&e| graph.edge_id(e)).collect();
    let dataset  = SeedDataset::new(partition.seed_indices);
    let seed_count = dataset.seed_count();

    let batcher = LinkNeighborBatcher::<B>::new(
        graph.clone(),
        cfg.num_neighbors.clone(),
        transform,
        cfg.seed,
        device.clone(),
    );

    let builder = DataLoaderBuilder::new(batcher).batch_size(cfg.batch_size);
    let builder = if shuffle { builder.shuffle(cfg.seed) } else { builder };

    Ok(PartitionLoader {
        kind: partition.kind,
        seed_count,
        seed_ids,
        loader: builder.build(dataset),
    })
}
