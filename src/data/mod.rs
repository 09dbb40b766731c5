// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from XML review corpora to tensor batches.
//
//   corpus .xml
//       │
//       ▼
//   XmlCorpusReader   → annotated sentences
//       │
//       ▼
//   TextNormalizer    → collapsed spaces, lowercased word tokens
//       │
//       ▼
//   Ingestor          → vocabularies, AspectExamples, side file
//       │               entries, skip-and-count diagnostics
//       ▼
//   AspectSample      → [CLS] words [SEP] + padding, shifted span
//       │
//       ▼
//   AspectDataset     → Burn Dataset
//       │
//       ▼
//   AspectBatcher     → tensor batches for the DataLoader

/// Typed ingestion errors
pub mod error;

/// Reads SemEval-style XML corpora
pub mod loader;

/// Space collapsing and word tokenisation
pub mod text;

/// nth-occurrence target placeholder substitution
pub mod placeholder;

/// Word and target-phrase vocabularies
pub mod vocab;

/// Two-pass corpus ingestion
pub mod ingest;

/// Encoder samples and Burn's Dataset trait
pub mod dataset;

/// Burn's Batcher trait for aspect samples
pub mod batcher;

/// Seeded, domain-stratified train/validation split
pub mod splitter;
