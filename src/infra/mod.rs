// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles the cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs     — Saving and loading pipeline weights
//                       with Burn's CompactRecorder, plus the
//                       TrainConfig and the model manifest as
//                       JSON so a pipeline can be rebuilt.
//
//   dataset_store.rs  — Ingestion outputs: per-corpus side
//                       files, corpus.json and vocab.json.
//
//   metrics.rs        — Training metrics logging
//                       Writes epoch-level loss, accuracies and
//                       mask percentage to a CSV file.

/// Pipeline checkpoint saving and loading
pub mod checkpoint;

/// Side files, ingested corpora and vocabularies on disk
pub mod dataset_store;

/// Training metrics CSV logger
pub mod metrics;
