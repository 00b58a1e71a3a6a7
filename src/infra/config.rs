// ============================================================
// Layer 6 — Run Configuration
// ============================================================
// Two JSON files feed a run besides the command line:
//
//   data_config.json
//     { "paths": { "aml_data": "...", "model_to_load": "..." } }
//
//   model_settings.json  (optional)
//     { "gin": { "params": { "lr": 0.006, "n_hidden": 66, ... } },
//       "gat": { ... }, "pna": { ... } }
//
// Hyper-parameters are looked up per model family. Anything
// the settings file does not define falls back to the built-in
// table below, so a missing file is not an error.
//
// Integer parameters may be written as floats (tuning tools
// emit e.g. 66.003); they are truncated.

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::HashMap, fs, path::{Path, PathBuf}};

use crate::domain::family::ModelFamily;

// ─── data_config.json ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root directory holding one sub-directory per dataset
    pub aml_data:      PathBuf,
    /// Directory holding `checkpoint_<name>.tar` files
    pub model_to_load: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub paths: DataPaths,
}

impl DataConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read data config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed data config '{}'", path.display()))
    }
}

// ─── model_settings.json ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilySettings {
    #[serde(default)]
    pub params: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSettings {
    families: HashMap<String, FamilySettings>,
}

const BUILTIN: &[(&str, &[(&str, f64)])] = &[
    ("gin", &[
        ("lr", 0.006213266113989207),
        ("n_hidden", 66.0),
        ("n_gnn_layers", 2.0),
        ("w_ce1", 1.0000182882773443),
        ("w_ce2", 6.275014431494497),
        ("dropout", 0.00983468338330501),
        ("final_dropout", 0.10527690625126304),
    ]),
    ("gat", &[
        ("lr", 0.006213266113989207),
        ("n_hidden", 64.0),
        ("n_heads", 4.0),
        ("n_gnn_layers", 2.0),
        ("w_ce1", 1.0000182882773443),
        ("w_ce2", 6.275014431494497),
        ("dropout", 0.00983468338330501),
        ("final_dropout", 0.10527690625126304),
    ]),
    ("pna", &[
        ("lr", 0.0006116418195373612),
        ("n_hidden", 20.0),
        ("n_gnn_layers", 2.0),
        ("w_ce1", 1.0003967674725277),
        ("w_ce2", 7.077633468006714),
        ("dropout", 0.08341111339579204),
        ("final_dropout", 0.28617938332077405),
    ]),
];

impl ModelSettings {
    /// The built-in parameter table.
    pub fn builtin() -> Self {
        let families = BUILTIN
            .iter()
            .map(|(family, params)| {
                let params = params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
                (family.to_string(), FamilySettings { params })
            })
            .collect();
        Self { families }
    }

    /// Read a settings file layered over the built-in table; a missing file
    /// yields the built-in table alone.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("No model settings at '{}', using built-in defaults", path.display());
            return Ok(Self::builtin());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model settings '{}'", path.display()))?;
        let file: Self = serde_json::from_str(&json)
            .with_context(|| format!("Malformed model settings '{}'", path.display()))?;
        Ok(Self::builtin().overlay(file))
    }

    /// `other`'s values replace ours parameter by parameter.
    pub fn overlay(mut self, other: Self) -> Self {
        for (family, settings) in other.families {
            self.families.entry(family).or_default().params.extend(settings.params);
        }
        self
    }

    /// Value of `name` for `family`.
    pub fn param(&self, family: ModelFamily, name: &str) -> Option<f64> {
        self.families
            .get(family.as_str())
            .and_then(|f| f.params.get(name))
            .copied()
    }
}

// ─── Hyper-parameters ─────────────────────────────────────────────────────────

/// The hyper-parameters of one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParams {
    pub lr:            f64,
    pub n_hidden:      usize,
    pub n_gnn_layers:  usize,
    pub w_ce1:         f64,
    pub w_ce2:         f64,
    pub dropout:       f64,
    pub final_dropout: f64,
    /// Only set for attention models
    pub n_heads:       Option<usize>,
}

impl HyperParams {
    pub fn extract(family: ModelFamily, settings: &ModelSettings) -> Result<Self> {
        let get = |name: &str| {
            settings
                .param(family, name)
                .with_context(|| format!("model family '{family}' has no '{name}' parameter"))
        };
        let count = |name: &str| -> Result<usize> {
            let v = get(name)?;
            ensure!(v >= 1.0, "'{name}' must be at least 1, got {v}");
            Ok(v as usize)
        };
        let rate = |name: &str| -> Result<f64> {
            let v = get(name)?;
            ensure!((0.0..1.0).contains(&v), "'{name}' must lie in [0, 1), got {v}");
            Ok(v)
        };

        let n_heads = if family.uses_heads() { Some(count("n_heads")?) } else { None };
        let hyper = Self {
            lr:            get("lr")?,
            n_hidden:      count("n_hidden")?,
            n_gnn_layers:  count("n_gnn_layers")?,
            w_ce1:         get("w_ce1")?,
            w_ce2:         get("w_ce2")?,
            dropout:       rate("dropout")?,
            final_dropout: rate("final_dropout")?,
            n_heads,
        };

        if let Some(heads) = hyper.n_heads {
            if hyper.n_hidden % heads != 0 {
                bail!("n_hidden ({}) must be divisible by n_heads ({heads})", hyper.n_hidden);
            }
        }
        Ok(hyper)
    }
}

// ─── Run snapshot ─────────────────────────────────────────────────────────────

/// Everything a run was configured with, fixed before any work starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub family:        ModelFamily,
    pub data:          String,
    pub n_epochs:      usize,
    pub batch_size:    usize,
    pub num_neighbors: Vec<usize>,
    pub hyper:         HyperParams,
}

impl RunConfig {
    /// The flat configuration recorded with the tracking run.
    pub fn snapshot(&self) -> Value {
        json!({
            "epochs":        self.n_epochs,
            "batch_size":    self.batch_size,
            "model":         self.family.as_str(),
            "data":          self.data,
            "num_neighbors": self.num_neighbors,
            "lr":            self.hyper.lr,
            "n_hidden":      self.hyper.n_hidden,
            "n_gnn_layers":  self.hyper.n_gnn_layers,
            "loss":          "ce",
            "w_ce1":         self.hyper.w_ce1,
            "w_ce2":         self.hyper.w_ce2,
            "dropout":       self.hyper.dropout,
            "final_dropout": self.hyper.final_dropout,
            "n_heads":       self.hyper.n_heads,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ModelSettings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.param(ModelFamily::Pna, "n_hidden"), Some(20.0));
    }

    #[test]
    fn test_file_values_override_and_gaps_fall_back() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_settings.json");
        fs::write(&path, r#"{"gin": {"params": {"n_hidden": 32.7, "lr": 0.01}}}"#).unwrap();

        let settings = ModelSettings::load(&path).unwrap();
        let hyper = HyperParams::extract(ModelFamily::Gin, &settings).unwrap();
        assert_eq!(hyper.n_hidden, 32);
        assert_eq!(hyper.lr, 0.01);
        assert_eq!(hyper.n_gnn_layers, 2);
        assert_eq!(hyper.n_heads, None);
    }

    #[test]
    fn test_overlay_keeps_builtin_gaps_and_other_families() {
        let file: ModelSettings =
            serde_json::from_str(r#"{"pna": {"params": {"lr": 0.5}}, "gat": {"params": {}}}"#).unwrap();
        let merged = ModelSettings::builtin().overlay(file);

        assert_eq!(merged.param(ModelFamily::Pna, "lr"), Some(0.5));
        assert_eq!(merged.param(ModelFamily::Pna, "n_hidden"), Some(20.0));
        assert_eq!(merged.param(ModelFamily::Gat, "n_heads"), Some(4.0));
        assert_eq!(merged.param(ModelFamily::Gin, "n_hidden"), Some(66.0));
    }

    #[test]
    fn test_lookup_does_not_consult_builtin_table() {
        let empty = ModelSettings::default();
        assert_eq!(empty.param(ModelFamily::Gin, "lr"), None);
        assert!(HyperParams::extract(ModelFamily::Gin, &empty).is_err());
    }

    #[test]
    fn test_heads_only_for_gat() {
        let settings = ModelSettings::builtin();
        assert_eq!(HyperParams::extract(ModelFamily::Gat, &settings).unwrap().n_heads, Some(4));
        assert_eq!(HyperParams::extract(ModelFamily::Pna, &settings).unwrap().n_heads, None);
    }

    #[test]
    fn test_indivisible_heads_rejected() {
        let mut settings = ModelSettings::builtin();
        settings
            .families
            .get_mut("gat")
            .unwrap()
            .params
            .insert("n_hidden".into(), 30.0);
        assert!(HyperParams::extract(ModelFamily::Gat, &settings).is_err());
    }

    #[test]
    fn test_data_config_parses_paths() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_config.json");
        fs::write(&path, r#"{"paths": {"aml_data": "/data/aml", "model_to_load": "/models"}}"#).unwrap();
        let cfg = DataConfig::load(&path).unwrap();
        assert_eq!(cfg.paths.aml_data, PathBuf::from("/data/aml"));
        assert_eq!(cfg.paths.model_to_load, PathBuf::from("/models"));
    }

    #[test]
    fn test_data_config_missing_file_names_path() {
        let err = DataConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_snapshot_fields() {
        let cfg = RunConfig {
            family:        ModelFamily::Pna,
            data:          "Small_HI".into(),
            n_epochs:      100,
            batch_size:    8192,
            num_neighbors: vec![100, 100],
            hyper:         HyperParams::extract(ModelFamily::Pna, &ModelSettings::builtin()).unwrap(),
        };
        let snap = cfg.snapshot();
        assert_eq!(snap["model"], "pna");
        assert_eq!(snap["loss"], "ce");
        assert_eq!(snap["num_neighbors"], json!([100, 100]));
        assert!(snap["n_heads"].is_null());
    }
}
