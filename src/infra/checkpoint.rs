// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores (and, for the training side and tests, writes) model
// weights.
//
// One checkpoint is one tar archive:
//
//   <model_to_load>/checkpoint_<unique_name>.tar
//     meta.json        — { "epoch": N, "architecture": {...} }
//     model_state.bin  — Burn record of every parameter,
//                        BinBytesRecorder, full precision
//
// Burn's load_record replaces tensors without comparing shapes,
// so the architecture stored in meta.json is compared with the
// freshly built model before any weights are touched.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::ml::model::{EdgeClassifier, ModelArchitecture};

const META_ENTRY: &str = "meta.json";
const STATE_ENTRY: &str = "model_state.bin";

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint not found at '{0}'")]
    Missing(PathBuf),

    #[error("Checkpoint '{path}' is unreadable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error(
        "Checkpoint '{path}' was saved for a different model \
         (saved {saved:?}, built {built:?})"
    )]
    ArchitectureMismatch {
        path:  PathBuf,
        saved: Box<ModelArchitecture>,
        built: Box<ModelArchitecture>,
    },

    #[error("Cannot write checkpoint '{path}': {source}")]
    Write {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The metadata half of a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch:        usize,
    pub architecture: ModelArchitecture,
}

/// `<dir>/checkpoint_<unique_name>.tar`
pub fn checkpoint_path(dir: impl AsRef<Path>, unique_name: &str) -> PathBuf {
    dir.as_ref().join(format!("checkpoint_{unique_name}.tar"))
}

#[derive(Debug, Default, Clone)]
pub struct CheckpointManager {
    recorder: BinBytesRecorder<FullPrecisionSettings>,
}

impl CheckpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every parameter of `model` with the checkpoint at `path`.
    /// Returns the restored model and the epoch it was saved at.
    pub fn load<B: Backend>(
        &self,
        path:         &Path,
        model:        EdgeClassifier<B>,
        architecture: &ModelArchitecture,
        device:       &B::Device,
    ) -> Result<(EdgeClassifier<B>, usize), CheckpointError> {
        let (meta, state) = read_archive(path)?;

        if &meta.architecture != architecture {
            return Err(CheckpointError::ArchitectureMismatch {
                path:  path.to_path_buf(),
                saved: Box::new(meta.architecture),
                built: Box::new(architecture.clone()),
            });
        }

        let record = self
            .recorder
            .load(state, device)
            .map_err(|e| corrupt(path, format!("{STATE_ENTRY}: {e:?}")))?;

        tracing::debug!("Restored {} parameters from '{}'", model.num_params(), path.display());
        Ok((model.load_record(record), meta.epoch))
    }

    /// Write `model` as a checkpoint at `path`, creating parent directories.
    /// The inference binary only reads checkpoints; tests and trainers write them.
    #[allow(dead_code)]
    pub fn save<B: Backend>(
        &self,
        path:         &Path,
        model:        &EdgeClassifier<B>,
        architecture: &ModelArchitecture,
        epoch:        usize,
    ) -> Result<(), CheckpointError> {
        let write_err = |source| CheckpointError::Write { path: path.to_path_buf(), source };

        let state = self
            .recorder
            .record(model.clone().into_record(), ())
            .map_err(|e| corrupt(path, format!("cannot serialise model: {e:?}")))?;
        let meta = serde_json::to_vec_pretty(&CheckpointMeta {
            epoch,
            architecture: architecture.clone(),
        })
        .map_err(|e| corrupt(path, e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut builder = tar::Builder::new(File::create(path).map_err(write_err)?);
        append(&mut builder, META_ENTRY, &meta).map_err(write_err)?;
        append(&mut builder, STATE_ENTRY, &state).map_err(write_err)?;
        builder.finish().map_err(write_err)?;

        tracing::debug!("Saved checkpoint: epoch {} to '{}'", epoch, path.display());
        Ok(())
    }

    /// Read only the metadata of a checkpoint.
    pub fn inspect(&self, path: &Path) -> Result<CheckpointMeta, CheckpointError> {
        read_archive(path).map(|(meta, _)| meta)
    }
}

fn append(builder: &mut tar::Builder<File>, name: &str, data: &[u8]) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, data)
}

fn corrupt(path: &Path, reason: impl Into<String>) -> CheckpointError {
    CheckpointError::Corrupt { path: path.to_path_buf(), reason: reason.into() }
}

fn read_archive(path: &Path) -> Result<(CheckpointMeta, Vec<u8>), CheckpointError> {
    if !path.is_file() {
        return Err(CheckpointError::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| corrupt(path, e.to_string()))?;
    let mut archive = tar::Archive::new(file);

    let mut meta  = None;
    let mut state = None;
    let entries = archive.entries().map_err(|e| corrupt(path, e.to_string()))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| corrupt(path, e.to_string()))?;
        let name = entry
            .path()
            .map_err(|e| corrupt(path, e.to_string()))?
            .to_string_lossy()
            .into_owned();

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| corrupt(path, e.to_string()))?;

        match name.as_str() {
            META_ENTRY  => meta = Some(bytes),
            STATE_ENTRY => state = Some(bytes),
            other       => tracing::debug!("Ignoring checkpoint entry '{}'", other),
        }
    }

    let meta  = meta.ok_or_else(|| corrupt(path, format!("no {META_ENTRY} entry")))?;
    let state = state.ok_or_else(|| corrupt(path, format!("no {STATE_ENTRY} entry")))?;
    let meta: CheckpointMeta = serde_json::from_slice(&meta)
        .map_err(|e| corrupt(path, format!("{META_ENTRY}: {e}")))?;
    Ok((meta, state))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::family::ModelFamily;
    use crate::ml::model::EdgeClassifierConfig;
    use crate::testing::TestBackend;

    fn config() -> EdgeClassifierConfig {
        EdgeClassifierConfig::new(ModelFamily::Gin, 3, 2, 8, 2, 0.0, 0.0)
    }

    fn outputs(model: &EdgeClassifier<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([3, 3], &device);
        let rel = crate::data::batcher::RelationInput {
            src:       Tensor::from_ints([0, 1, 2], &device),
            dst:       Tensor::from_ints([1, 2, 0], &device),
            edge_attr: Tensor::ones([3, 2], &device),
        };
        model
            .forward(x, &[rel], Tensor::from_ints([0, 2], &device))
            .unwrap()
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn test_round_trip_restores_weights_and_epoch() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = checkpoint_path(dir.path(), "True");
        let device = Default::default();
        let arch   = config().architecture(1);
        let saved: EdgeClassifier<TestBackend> = config().init(&device).unwrap();

        let manager = CheckpointManager::new();
        manager.save(&path, &saved, &arch, 17).unwrap();

        let fresh = config().init::<TestBackend>(&device).unwrap();
        assert_ne!(outputs(&fresh), outputs(&saved));

        let (restored, epoch) = manager.load(&path, fresh, &arch, &device).unwrap();
        assert_eq!(epoch, 17);
        assert_eq!(outputs(&restored), outputs(&saved));
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), "True");
        let model = config().init::<TestBackend>(&Default::default()).unwrap();
        let err = CheckpointManager::new()
            .load(&path, model, &config().architecture(1), &Default::default())
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Missing(p) if p == path));
    }

    #[test]
    fn test_architecture_mismatch_is_reported() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = checkpoint_path(dir.path(), "run");
        let device = Default::default();
        let model  = config().init::<TestBackend>(&device).unwrap();
        CheckpointManager::new().save(&path, &model, &config().architecture(1), 1).unwrap();

        let wider = EdgeClassifierConfig::new(ModelFamily::Gin, 3, 2, 16, 2, 0.0, 0.0);
        let err = CheckpointManager::new()
            .load(&path, wider.init::<TestBackend>(&device).unwrap(), &wider.architecture(1), &device)
            .unwrap_err();
        assert!(matches!(err, CheckpointError::ArchitectureMismatch { .. }));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir  = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), "bad");
        fs::write(&path, b"not a tar archive at all").unwrap();
        let err = CheckpointManager::new().inspect(&path).unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
    }

    #[test]
    fn test_inspect_reads_metadata() {
        let dir  = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), "meta");
        let cfg  = config();
        let model = cfg.init::<TestBackend>(&Default::default()).unwrap();
        let arch = cfg.architecture(1);
        CheckpointManager::new().save(&path, &model, &arch, 3).unwrap();

        let meta = CheckpointManager::new().inspect(&path).unwrap();
        assert_eq!(meta, CheckpointMeta { epoch: 3, architecture: arch });
    }

    #[test]
    fn test_path_layout() {
        assert_eq!(checkpoint_path("/models", "True"), PathBuf::from("/models/checkpoint_True.tar"));
    }
}
