// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// system works with: annotated review sentences, opinions,
// polarity labels and the aspect examples built from them.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or tensor code
//   - Only plain Rust structs, enums, and traits
//
// Everything in here can be unit tested without a backend.

// Review sentences and the opinions annotated on them
pub mod sentence;

// Polarity labels and the aspect examples produced by ingestion
pub mod opinion;

// Core abstractions (traits) that other layers implement
pub mod traits;
