// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The edge classifier and everything it is built from.
//
//   message.rs   — gather / scatter-add / segment softmax
//                  on top of Burn tensors
//
//   conv.rs      — GIN, GAT and PNA convolutions over one
//                  relation, plus the GnnConv wrapper chosen
//                  by ModelFamily
//
//   model.rs     — EdgeClassifier: embeddings, stacked
//                  message-passing layers with residual
//                  updates, optional edge updates, the
//                  3-layer classification head, and the
//                  heterogeneous (per-relation) conversion
//
//   evaluator.rs — argmax over seed-edge logits and the
//                  homogeneous / heterogeneous procedures
//
// Reference: Burn Book §3 (Building Blocks)
//            Xu et al. (2019) GIN, Hu et al. (2020) GINE
//            Veličković et al. (2018) GAT
//            Corso et al. (2020) PNA

/// Scatter / gather helpers for message passing
pub mod message;

/// Per-family graph convolutions
pub mod conv;

/// Edge classification model
pub mod model;

/// Test-partition evaluation
pub mod evaluator;
