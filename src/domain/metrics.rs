// ============================================================
// Layer 3 — Evaluation Result
// ============================================================
// Binary classification metrics over the evaluated seed edges,
// with "illicit" (label 1) as the positive class.
//
// The serde names are the keys of the JSON object written to the
// log, in this exact order:
//   {"F1":..,"Precision":..,"Recall":..,"Accuracy":..,
//    "True Positives":..,"True Negatives":..,
//    "False Positives":..,"False Negatives":..}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(rename = "F1")]
    pub f1: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "True Positives")]
    pub true_positives: usize,
    #[serde(rename = "True Negatives")]
    pub true_negatives: usize,
    #[serde(rename = "False Positives")]
    pub false_positives: usize,
    #[serde(rename = "False Negatives")]
    pub false_negatives: usize,
}

impl EvaluationResult {
    /// Score `predictions` against `labels` (pairwise, same length).
    /// Ratios whose denominator is zero are reported as 0.0.
    pub fn from_predictions(predictions: &[u8], labels: &[u8]) -> Self {
        let (mut tp, mut tn, mut fp, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for (&pred, &label) in predictions.iter().zip(labels) {
            match (pred == 1, label == 1) {
                (true, true)   => tp += 1,
                (false, false) => tn += 1,
                (true, false)  => fp += 1,
                (false, true)  => fn_ += 1,
            }
        }

        let precision = ratio(tp, tp + fp);
        let recall    = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            f1,
            precision,
            recall,
            accuracy:        ratio(tp + tn, tp + tn + fp + fn_),
            true_positives:  tp,
            true_negatives:  tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Number of scored seed edges.
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
