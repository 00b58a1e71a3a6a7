// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams where other layers plug in concrete implementations.
//
//   - JsonGraphSource implements GraphSource
//   - HttpTransport implements TrackingTransport; tests plug in
//     a recording transport to observe exactly which requests
//     a run would send
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use serde_json::Value;

use crate::domain::graph::Partitions;

// ─── GraphSource ──────────────────────────────────────────────────────────────
/// Any component that can provide the train / validation / test partitions.
pub trait GraphSource {
    fn load_partitions(&self) -> Result<Partitions>;
}

// ─── TrackingTransport ────────────────────────────────────────────────────────
/// Delivers one JSON request to the experiment-tracking service and
/// returns its JSON reply (`Value::Null` for an empty body).
pub trait TrackingTransport {
    fn post(&self, path: &str, body: &Value) -> Result<Value>;
}
