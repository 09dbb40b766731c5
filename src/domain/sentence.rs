// ============================================================
// Layer 3 — Annotated Sentence Domain Type
// ============================================================
// One review sentence as it appears in the XML corpus, with
// every opinion annotated on it. Nothing has been filtered
// yet: conflict polarities and implicit targets are still
// present and are dropped later during ingestion.
//
// Example:
//   <sentence>
//     <text>The coffee was great.</text>
//     <Opinions>
//       <Opinion target="coffee" polarity="positive" occurrence="1"/>
//     </Opinions>
//   </sentence>

use serde::{Deserialize, Serialize};

/// Target value used by the corpus for opinions without an explicit target.
pub const IMPLICIT_TARGET: &str = "NULL";

/// Polarity value for opinions that are both positive and negative.
pub const CONFLICT_POLARITY: &str = "conflict";

/// A single raw opinion annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOpinion {
    /// Target phrase, `None` when the attribute is absent
    pub target: Option<String>,

    /// Polarity string exactly as written in the corpus
    pub polarity: String,

    /// Which occurrence of the target the opinion refers to (1-based)
    pub occurrence: usize,
}

impl RawOpinion {
    pub fn new(target: Option<String>, polarity: impl Into<String>, occurrence: usize) -> Self {
        Self {
            target,
            polarity: polarity.into(),
            occurrence,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.polarity == CONFLICT_POLARITY
    }

    /// Returns the target phrase unless it is absent or `NULL`.
    pub fn explicit_target(&self) -> Option<&str> {
        match self.target.as_deref() {
            Some(IMPLICIT_TARGET) | None => None,
            Some(t) => Some(t),
        }
    }
}

/// A review sentence and its opinions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    pub text: String,
    pub opinions: Vec<RawOpinion>,
}

impl AnnotatedSentence {
    pub fn new(text: impl Into<String>, opinions: Vec<RawOpinion>) -> Self {
        Self {
            text: text.into(),
            opinions,
        }
    }
}
