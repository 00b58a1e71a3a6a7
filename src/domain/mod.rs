// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the system:
// transaction graphs, their partitions, the model family tag
// and the evaluation record.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Everything here is unit-testable without a tensor backend.

// Graph partitions and the edge-id bookkeeping on them
pub mod graph;

// The eight-metric evaluation record
pub mod metrics;

// Which message-passing architecture a run uses
pub mod family;

// Core abstractions (traits) that other layers implement
pub mod traits;
