// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `infer` and `inspect`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, ModelFamily, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::infer_use_case::InferConfig;
use crate::domain::family::ModelFamily;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore a checkpoint and evaluate it on the test partition
    Infer(InferArgs),

    /// Print the metadata stored in a checkpoint
    Inspect(InspectArgs),
}

/// All arguments for the `infer` command.
#[derive(Args, Debug)]
pub struct InferArgs {
    /// Dataset name, a sub-directory of the configured aml_data path
    #[arg(long)]
    pub data: String,

    /// Model family: gin, gat or pna
    #[arg(long)]
    pub model: ModelFamily,

    /// Disable experiment tracking
    #[arg(long)]
    pub testing: bool,

    /// Epoch count of the training run (recorded only)
    #[arg(long, default_value_t = 100)]
    pub n_epochs: usize,

    /// Seed edges per batch
    #[arg(long, default_value_t = 8192)]
    pub batch_size: usize,

    /// Neighbours sampled per hop, e.g. `--num-neighs 100 100`
    #[arg(long, num_args = 1.., default_values_t = [100, 100])]
    pub num_neighs: Vec<usize>,

    /// Flag the seed edge endpoints with an extra node feature
    #[arg(long)]
    pub ego: bool,

    /// Also pass messages along reversed edges
    #[arg(long)]
    pub reverse_mp: bool,

    /// Update edge embeddings after every layer
    #[arg(long)]
    pub edge_updates: bool,

    /// Seed for neighbour sampling and loader shuffling
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Checkpoint to restore: checkpoint_<unique-name>.tar
    #[arg(long, default_value = "True")]
    pub unique_name: String,

    /// Data-path configuration file
    #[arg(long, default_value = "data_config.json")]
    pub data_config: PathBuf,

    /// Per-family hyper-parameter file (built-in defaults if absent)
    #[arg(long, default_value = "model_settings.json")]
    pub model_settings: PathBuf,

    /// Base URL of the experiment-tracking service
    #[arg(long, env = "GNN_TRACKER_URL", default_value = "http://localhost:8080")]
    pub tracker_url: String,

    /// Bearer token for the tracking service
    #[arg(long, env = "GNN_TRACKER_API_KEY", hide_env_values = true)]
    pub tracker_api_key: Option<String>,
}

/// The application layer never sees clap types.
impl From<InferArgs> for InferConfig {
    fn from(a: InferArgs) -> Self {
        InferConfig {
            data:            a.data,
            model:           a.model,
            testing:         a.testing,
            n_epochs:        a.n_epochs,
            batch_size:      a.batch_size,
            num_neighs:      a.num_neighs,
            ego:             a.ego,
            reverse_mp:      a.reverse_mp,
            edge_updates:    a.edge_updates,
            seed:            a.seed,
            unique_name:     a.unique_name,
            data_config:     a.data_config,
            model_settings:  a.model_settings,
            tracker_url:     a.tracker_url,
            tracker_api_key: a.tracker_api_key,
        }
    }
}

/// All arguments for the `inspect` command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to a checkpoint_<name>.tar file
    #[arg(long)]
    pub checkpoint: PathBuf,
}
