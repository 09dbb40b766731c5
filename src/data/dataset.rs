use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::opinion::AspectExample;

/// Encoder token ids. The ingestion vocabulary keeps `<pad>` at 0 and the
/// structural tokens are appended after its last word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTokens {
    pub pad: usize,
    pub cls: usize,
    pub sep: usize,
    pub mask: usize,
}

impl SpecialTokens {
    pub fn after_vocabulary(word_count: usize) -> Self {
        Self {
            pad: 0,
            cls: word_count,
            sep: word_count + 1,
            mask: word_count + 2,
        }
    }

    /// Embedding table size needed by the encoder.
    pub fn vocab_size(&self) -> usize {
        self.mask + 1
    }
}

/// One padded encoder input.
/// Sequence format: [CLS] words [SEP] [PAD]...
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Aspect position in encoder coordinates, end exclusive
    pub target_span:    (usize, usize),
    pub domain:         usize,
    pub label:          usize,
}

impl AspectSample {
    /// Build a sample, truncating the sentence to fit `max_length`.
    /// Returns `None` when truncation would cut away the whole aspect.
    pub fn encode(example: &AspectExample, specials: SpecialTokens, max_length: usize) -> Option<Self> {
        let room = max_length.saturating_sub(2);
        let kept = example.token_ids.len().min(room);
        let (start, end) = example.aspect_span;
        if start >= kept {
            return None;
        }

        let mut input_ids: Vec<u32> = Vec::with_capacity(max_length);
        input_ids.push(specials.cls as u32);
        input_ids.extend(example.token_ids[..kept].iter().map(|&id| id as u32));
        input_ids.push(specials.sep as u32);

        let mut attention_mask = vec![1u32; input_ids.len()];
        input_ids.resize(max_length, specials.pad as u32);
        attention_mask.resize(max_length, 0);

        Some(Self {
            input_ids,
            attention_mask,
            target_span: (start + 1, end.min(kept) + 1),
            domain: example.domain,
            label: example.polarity.class_index(),
        })
    }
}

pub struct AspectDataset {
    samples: Vec<AspectSample>,
}

impl AspectDataset {
    pub fn new(samples: Vec<AspectSample>) -> Self { Self { samples } }
}

impl Dataset<AspectSample> for AspectDataset {
    fn get(&self, index: usize) -> Option<AspectSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
