// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `infer`   — restores a checkpoint and prints test metrics
//   2. `inspect` — prints a checkpoint's epoch and architecture
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, InferArgs, InspectArgs};

#[derive(Parser, Debug)]
#[command(
    name = "gnn-inference",
    version,
    about = "Evaluate a trained GNN edge classifier on the test partition of a transaction graph."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Infer(args)   => run_infer(args),
            Commands::Inspect(args) => run_inspect(args),
        }
    }
}

fn run_infer(args: InferArgs) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    tracing::info!("Evaluating {} on dataset '{}'", args.model, args.data);

    let use_case = InferUseCase::new(args.into())?;
    let result   = use_case.execute()?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::infra::checkpoint::CheckpointManager;

    let meta = CheckpointManager::new().inspect(&args.checkpoint)?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
