// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from partition files on disk to tensor batches.
//
//   <dataset>/{train,val,test}.json
//       │
//       ▼
//   JsonGraphSource      → validated Partitions
//       │
//       ▼
//   add_arange_ids       → dense edge ids (domain::graph)
//       │
//       ▼
//   SeedDataset          → Burn Dataset over seed edges
//       │
//       ▼
//   LinkNeighborBatcher  → samples neighbourhoods, applies the
//       │                  Transform, builds GraphBatch tensors
//       ▼
//   DataLoader           → one iterator per partition
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads partition JSON files
pub mod source;

/// Hop-wise neighbour sampling around seed edges
pub mod sampler;

/// Identity / ego-id feature augmentation
pub mod transform;

/// Implements Burn's Dataset trait over seed edge indices
pub mod dataset;

/// Implements Burn's Batcher trait to build subgraph batches
pub mod batcher;

/// Builds the train / validation / test DataLoaders
pub mod loader;
