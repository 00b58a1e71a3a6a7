// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application layer:
//
//   config.rs      — data_config.json, model_settings.json,
//                    per-family hyper-parameters and the run
//                    configuration snapshot
//
//   backend.rs     — compute backend and device selection
//
//   checkpoint.rs  — tar checkpoints (metadata + Burn record),
//                    typed CheckpointError
//
//   tracking.rs    — experiment-tracking run session and its
//                    HTTP transport
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Data paths and hyper-parameter settings
pub mod config;

/// Backend type and device selection
pub mod backend;

/// Checkpoint reading and writing
pub mod checkpoint;

/// Experiment-tracking session
pub mod tracking;
