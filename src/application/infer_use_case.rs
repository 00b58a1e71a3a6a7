// ============================================================
// Layer 2 — Inference Use Case
// ============================================================
// Restores a trained edge classifier and scores it on the test
// partition:
//
//   1. Start the tracking session with the config snapshot
//   2. Pick the transform (ego ids or identity)
//   3. Give every edge of every partition a dense id
//   4. Build the train / validation / test loaders
//   5. Size the model from one training batch
//   6. Optionally convert it to the reverse-message-passing view
//   7. Restore checkpoint_<unique_name>.tar
//   8. Evaluate on the test loader (homo or hetero procedure)
//   9. Log the eight metrics as one JSON object, send them as
//      the run summary and close the session
//
// If any step after 1 fails the session is closed as failed
// before the error is returned.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::context::RunContext;
use crate::data::{
    loader::{get_loaders, LoaderConfig, Loaders},
    source::JsonGraphSource,
    transform::Transform,
};
use crate::domain::{
    family::ModelFamily,
    graph::{add_arange_ids, Partitions},
    metrics::EvaluationResult,
    traits::{GraphSource, TrackingTransport},
};
use crate::infra::{
    backend::{select_device, InferBackend},
    checkpoint::{checkpoint_path, CheckpointManager},
    config::{DataConfig, HyperParams, ModelSettings, RunConfig},
    tracking::{HttpTransport, RunSession, RunStatus},
};
use crate::ml::{
    evaluator::EvalProcedure,
    model::{build_model, EdgeClassifier, ModelArchitecture},
};

/// Everything the `infer` command was asked to do.
/// Built from the CLI arguments; never sees clap types.
#[derive(Debug, Clone)]
pub struct InferConfig {
    pub data:            String,
    pub model:           ModelFamily,
    pub testing:         bool,
    pub n_epochs:        usize,
    pub batch_size:      usize,
    pub num_neighs:      Vec<usize>,
    pub ego:             bool,
    pub reverse_mp:      bool,
    pub edge_updates:    bool,
    pub seed:            u64,
    pub unique_name:     String,
    pub data_config:     PathBuf,
    pub model_settings:  PathBuf,
    pub tracker_url:     String,
    pub tracker_api_key: Option<String>,
}

impl InferConfig {
    pub fn procedure(&self) -> EvalProcedure {
        EvalProcedure::from_reverse_mp(self.reverse_mp)
    }

    fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size:    self.batch_size,
            num_neighbors: self.num_neighs.clone(),
            seed:          self.seed,
        }
    }
}

pub struct InferUseCase {
    config:      InferConfig,
    data_config: DataConfig,
    run:         RunConfig,
    ctx:         RunContext,
}

impl InferUseCase {
    /// Read both configuration files and fix the run configuration.
    pub fn new(config: InferConfig) -> Result<Self> {
        let ctx         = RunContext::new(config.testing);
        let data_config = DataConfig::load(&config.data_config)?;
        let settings    = ModelSettings::load(&config.model_settings)?;
        let hyper       = HyperParams::extract(config.model, &settings)?;

        let run = RunConfig {
            family:        config.model,
            data:          config.data.clone(),
            n_epochs:      config.n_epochs,
            batch_size:    config.batch_size,
            num_neighbors: config.num_neighs.clone(),
            hyper,
        };
        Ok(Self { config, data_config, run, ctx })
    }

    /// Run against the configured data directory and tracking service.
    pub fn execute(&self) -> Result<EvaluationResult> {
        let device    = select_device();
        let source    = JsonGraphSource::new(&self.data_config.paths.aml_data, &self.config.data);
        let transport = HttpTransport::new(&self.config.tracker_url, self.config.tracker_api_key.clone())?;
        self.execute_with::<InferBackend>(&source, Box::new(transport), &device)
    }

    pub fn execute_with<B: Backend>(
        &self,
        source:    &dyn GraphSource,
        transport: Box<dyn TrackingTransport>,
        device:    &B::Device,
    ) -> Result<EvaluationResult> {
        let partitions = source.load_partitions()?;
        tracing::info!(
            "Loaded dataset '{}': {} / {} / {} seed edges",
            self.config.data,
            partitions.train.seed_indices.len(),
            partitions.val.seed_indices.len(),
            partitions.test.seed_indices.len()
        );

        let result = infer_gnn::<B>(
            partitions,
            &self.config,
            &self.run,
            &self.data_config,
            &self.ctx,
            transport,
            device,
        );
        tracing::info!("Total runtime: {:.2?}", self.ctx.elapsed());
        result
    }
}

/// The components a run builds before touching the checkpoint.
pub struct Prepared<B: Backend> {
    pub loaders:      Loaders<B>,
    pub model:        EdgeClassifier<B>,
    pub architecture: ModelArchitecture,
}

/// Steps 2–6: transform, ids, loaders and a freshly initialised model.
pub fn prepare<B: Backend>(
    mut partitions: Partitions,
    config:         &InferConfig,
    run:            &RunConfig,
    device:         &B::Device,
) -> Result<Prepared<B>> {
    let transform = Transform::from_ego_flag(config.ego);

    add_arange_ids(&mut [
        &mut partitions.train.graph,
        &mut partitions.val.graph,
        &mut partitions.test.graph,
    ]);
    let avg_log_degree = partitions.train.graph.avg_log_degree();
    let hetero         = partitions.test.graph.hetero_metadata();

    let loaders = get_loaders::<B>(partitions, transform, &config.loader_config(), device)?;

    let sample = loaders.train.first_batch()?;
    let (model, model_config) = build_model(
        &sample,
        run.family,
        &run.hyper,
        config.edge_updates,
        avg_log_degree,
        device,
    )?;

    let model = if config.reverse_mp { model.to_hetero(&hetero) } else { model };
    let architecture = model_config.architecture(model.relation_count());

    Ok(Prepared { loaders, model, architecture })
}

/// Run one inference pass and report its metrics.
pub fn infer_gnn<B: Backend>(
    partitions:  Partitions,
    config:      &InferConfig,
    run:         &RunConfig,
    data_config: &DataConfig,
    ctx:         &RunContext,
    transport:   Box<dyn TrackingTransport>,
    device:      &B::Device,
) -> Result<EvaluationResult> {
    let mut session = RunSession::start(ctx.tracking(), &config.unique_name, &run.snapshot(), transport)?;

    match evaluate_checkpoint::<B>(partitions, config, run, data_config, &session, device) {
        Ok(result) => {
            session.finish(RunStatus::Finished)?;
            Ok(result)
        }
        Err(err) => {
            if let Err(finish_err) = session.finish(RunStatus::Failed) {
                tracing::warn!("Could not mark tracking run as failed: {finish_err:#}");
            }
            Err(err)
        }
    }
}

fn evaluate_checkpoint<B: Backend>(
    partitions:  Partitions,
    config:      &InferConfig,
    run:         &RunConfig,
    data_config: &DataConfig,
    session:     &RunSession,
    device:      &B::Device,
) -> Result<EvaluationResult> {
    let Prepared { loaders, model, architecture } = prepare::<B>(partitions, config, run, device)?;

    let path = checkpoint_path(&data_config.paths.model_to_load, &config.unique_name);
    tracing::info!("=> loading model checkpoint '{}'", path.display());
    let (model, epoch) = CheckpointManager::new().load(&path, model, &architecture, device)?;
    tracing::info!("=> loaded checkpoint (epoch {})", epoch);

    let result = config.procedure().run(&model, &loaders.test)?;

    let json = serde_json::to_string(&result).context("Cannot serialise metrics")?;
    tracing::info!("{}", json);
    session.log_summary(&result)?;
    Ok(result)
}
