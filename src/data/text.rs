// ============================================================
// Layer 4 — Sentence Normaliser and Word Tokeniser
// ============================================================
// Turns a raw review sentence into the word sequence used for
// vocabulary building and aspect location.
//
// Steps (applied in order):
//   1. Collapse runs of plain spaces into a single space
//      (tabs and newlines are left alone)
//   2. Split on whitespace and punctuation using the BERT
//      pre-tokeniser from the `tokenizers` crate
//   3. Lowercase every word
//
// "Great coffee, bad service!" → great | coffee | , | bad | service | !

use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

use crate::data::error::IngestError;

pub struct TextNormalizer {
    pre_tokenizer: BertPreTokenizer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self { pre_tokenizer: BertPreTokenizer }
    }

    /// Replace every run of spaces with one space.
    pub fn collapse_spaces(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last_space = false;

        for c in text.chars() {
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out
    }

    /// Split text into words and punctuation marks, keeping original case.
    pub fn split_words(&self, text: &str) -> Result<Vec<String>, IngestError> {
        let mut pre = PreTokenizedString::from(self.collapse_spaces(text));
        self.pre_tokenizer
            .pre_tokenize(&mut pre)
            .map_err(|e| IngestError::Tokenize(e.to_string()))?;

        Ok(pre
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(word, _, _)| word.to_string())
            .collect())
    }

    /// Lowercased word tokens of a sentence.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>, IngestError> {
        Ok(self
            .split_words(text)?
            .into_iter()
            .map(|w| w.to_lowercase())
            .collect())
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
