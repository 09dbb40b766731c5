// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (ingesting corpora or training the masker).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file format handling (that's Layer 4 and 6)
//   - Only workflow coordination

// XML corpora → side files, corpus.json, vocab.json
pub mod ingest_use_case;

// The training workflow
pub mod train_use_case;
