// ============================================================
// Layer 3 — Polarity and AspectExample Domain Types
// ============================================================
// An AspectExample is one (sentence, target phrase, polarity)
// triple after ingestion, expressed in vocabulary indices.
//
//   token_ids    — word index per sentence token (0 = <pad>)
//   distances    — 1 - d/len per token, d = distance to the aspect
//   target_index — index of the target phrase in the phrase vocabulary
//   aspect_span  — [start, end) of the aspect among the tokens
//   polarity     — negative / neutral / positive
//   domain       — which corpus the sentence came from

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::error::IngestError;

/// Sentiment polarity of an aspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Negative,
    Neutral,
    Positive,
}

impl Polarity {
    /// Signed label written to the side file: -1, 0 or 1.
    pub fn label(self) -> i8 {
        match self {
            Polarity::Negative => -1,
            Polarity::Neutral => 0,
            Polarity::Positive => 1,
        }
    }

    /// Class index used as the cross-entropy target: 0, 1 or 2.
    pub fn class_index(self) -> usize {
        (self.label() + 1) as usize
    }
}

impl FromStr for Polarity {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "negative" => Ok(Polarity::Negative),
            "neutral" => Ok(Polarity::Neutral),
            "positive" => Ok(Polarity::Positive),
            other => Err(IngestError::UnknownPolarity(other.to_string())),
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One ingested aspect example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectExample {
    pub token_ids: Vec<usize>,
    pub distances: Vec<f32>,
    pub target_index: usize,
    /// Aspect token positions, end exclusive
    pub aspect_span: (usize, usize),
    pub polarity: Polarity,
    pub domain: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!("negative".parse::<Polarity>().unwrap().label(), -1);
        assert_eq!("neutral".parse::<Polarity>().unwrap().label(), 0);
        assert_eq!("positive".parse::<Polarity>().unwrap().label(), 1);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let err = "mixed".parse::<Polarity>().unwrap_err();
        assert!(matches!(err, IngestError::UnknownPolarity(ref s) if s == "mixed"));
    }

    #[test]
    fn test_class_index_is_shifted_label() {
        assert_eq!(Polarity::Negative.class_index(), 0);
        assert_eq!(Polarity::Neutral.class_index(), 1);
        assert_eq!(Polarity::Positive.class_index(), 2);
    }
}
