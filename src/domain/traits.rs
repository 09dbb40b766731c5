// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads corpora through CorpusSource
// and never sees the XML format. A different annotation
// format only needs a new implementation of the trait.

use anyhow::Result;
use crate::domain::sentence::AnnotatedSentence;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce annotated review sentences.
///
/// Implementations:
///   - XmlCorpusReader → SemEval-style XML files
pub trait CorpusSource {
    /// Load every sentence, in document order.
    fn load_sentences(&self) -> Result<Vec<AnnotatedSentence>>;

    /// Human readable name used in log lines.
    fn name(&self) -> String;
}
