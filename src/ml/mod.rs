// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code. The data layer only
// touches Burn through its Dataset and Batcher traits.
//
// What's in this layer, bottom-up:
//
//   ops.rs          — masked softmax, structural mask,
//                     straight-through, gradient reversal
//   gate.rs         — Gumbel-softmax relaxed binary gate
//   descriptors.rs  — learned per-domain descriptors
//   classifiers.rs  — domain and sentiment heads
//   encoder.rs      — ContextEncoder trait + transformer encoder
//   extractor.rs    — shared / private representation extractor
//   contexts.rs     — left / target / right context split
//   lcr.rs          — LCR-Rot-hop sentiment sub-network
//   model.rs        — BERTMasker-plus and the training pipeline
//   trainer.rs      — train + validation loop, checkpoints
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Shared tensor building blocks
pub mod ops;

/// Relaxed binary gate with straight-through rounding
pub mod gate;

/// Per-domain descriptor store
pub mod descriptors;

/// Adversarial domain and sentiment classifiers
pub mod classifiers;

/// Context encoder abstraction and transformer implementation
pub mod encoder;

/// Shared / private token masking
pub mod extractor;

/// Left / target / right partitioning
pub mod contexts;

/// LCR-Rot-hop with hierarchical attention
pub mod lcr;

/// BERTMasker-plus orchestrator and encoder pipeline
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;
