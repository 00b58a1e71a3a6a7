// ============================================================
// Layer 5 — Evaluator
// ============================================================
// One pass over a partition loader:
//
//   for each GraphBatch
//       logits = model.forward(x, relations, seed_positions)
//       pred   = argmax(logits, 1)          → 0 / 1 per seed edge
//       collect (seed edge id, pred, label)
//   align with the loader's seed ids
//   EvaluationResult::from_predictions(...)
//
// Every seed id must come back exactly once; a duplicate, an
// unknown id or a missing seed fails the evaluation.
//
// evaluate_homo feeds the batch as one `to` relation;
// evaluate_hetero feeds `to` plus the flipped `rev_to` relation.
// A model built for the other view rejects the batch.
//
// No gradients are tracked here: inference backends are not
// autodiff backends, so dropout is inactive as well.

use anyhow::{bail, ensure, Context, Result};
use burn::prelude::*;
use std::collections::HashMap;

use crate::data::{batcher::GraphBatch, loader::PartitionLoader};
use crate::domain::{graph::Relation, metrics::EvaluationResult};
use crate::ml::model::EdgeClassifier;

/// Which evaluation routine a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalProcedure {
    Homo,
    Hetero,
}

impl EvalProcedure {
    pub fn from_reverse_mp(reverse_mp: bool) -> Self {
        if reverse_mp { EvalProcedure::Hetero } else { EvalProcedure::Homo }
    }

    pub fn relations(&self) -> &'static [Relation] {
        match self {
            EvalProcedure::Homo   => &[Relation::To],
            EvalProcedure::Hetero => &[Relation::To, Relation::RevTo],
        }
    }

    pub fn run<B: Backend>(
        &self,
        model:  &EdgeClassifier<B>,
        loader: &PartitionLoader<B>,
    ) -> Result<EvaluationResult> {
        match self {
            EvalProcedure::Homo   => evaluate_homo(model, loader),
            EvalProcedure::Hetero => evaluate_hetero(model, loader),
        }
    }
}

pub fn evaluate_homo<B: Backend>(
    model:  &EdgeClassifier<B>,
    loader: &PartitionLoader<B>,
) -> Result<EvaluationResult> {
    evaluate(model, loader, EvalProcedure::Homo.relations())
}

pub fn evaluate_hetero<B: Backend>(
    model:  &EdgeClassifier<B>,
    loader: &PartitionLoader<B>,
) -> Result<EvaluationResult> {
    evaluate(model, loader, EvalProcedure::Hetero.relations())
}

fn evaluate<B: Backend>(
    model:     &EdgeClassifier<B>,
    loader:    &PartitionLoader<B>,
    relations: &[Relation],
) -> Result<EvaluationResult> {
    let stem = loader.kind.file_stem();
    let mut collected = Vec::with_capacity(loader.seed_count);

    for (i, batch) in loader.loader.iter().enumerate() {
        let batch_preds = predict_batch(model, &batch, relations)
            .with_context(|| format!("Evaluation failed on {stem} batch {i}"))?;
        ensure!(
            batch_preds.len() == batch.seed_edge_ids.len() && batch_preds.len() == batch.labels.len(),
            "{stem} batch {i}: {} predictions for {} seed ids and {} labels",
            batch_preds.len(),
            batch.seed_edge_ids.len(),
            batch.labels.len(),
        );
        tracing::debug!("Batch {}: {} seed edges, {} nodes", i, batch.num_seeds(), batch.num_nodes);

        collected.extend(
            batch.seed_edge_ids.iter().zip(batch_preds).zip(&batch.labels).map(|((&id, p), &l)| (id, p, l)),
        );
    }

    let (preds, labels) = align_predictions(&loader.seed_ids, collected)
        .with_context(|| format!("Predictions do not match the {stem} seed edges"))?;
    let result = EvaluationResult::from_predictions(&preds, &labels);
    tracing::info!("Evaluated {} {} seed edges", result.total(), stem);
    Ok(result)
}

/// Order `(edge id, pred, label)` triples by `expected` seed ids.
/// Each expected id must appear exactly once and nothing else may.
pub fn align_predictions(
    expected:  &[usize],
    collected: Vec<(usize, u8, u8)>,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut by_id: HashMap<usize, (u8, u8)> = HashMap::with_capacity(collected.len());
    for (id, pred, label) in collected {
        ensure!(by_id.insert(id, (pred, label)).is_none(), "seed edge {id} predicted twice");
    }

    let mut preds  = Vec::with_capacity(expected.len());
    let mut labels = Vec::with_capacity(expected.len());
    for id in expected {
        let (pred, label) = by_id.remove(id).with_context(|| format!("no prediction for seed edge {id}"))?;
        preds.push(pred);
        labels.push(label);
    }

    if let Some(id) = by_id.keys().min() {
        bail!("prediction for edge {id}, which is not a seed of this partition");
    }
    Ok((preds, labels))
}

/// Predicted class per seed edge of one batch.
pub fn predict_batch<B: Backend>(
    model:     &EdgeClassifier<B>,
    batch:     &GraphBatch<B>,
    relations: &[Relation],
) -> Result<Vec<u8>> {
    let inputs: Vec<_> = relations.iter().map(|&r| batch.relation(r)).collect();
    let logits = model.forward(batch.x.clone(), &inputs, batch.seed_positions.clone())?;

    // argmax(1) returns [seeds, 1]
    let classes = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read predictions: {e:?}"))?;

    Ok(classes.into_iter().map(|c| u8::from(c == 1)).collect())
}
