// ============================================================
// Layer 4 — Vocabularies
// ============================================================
// Two vocabularies are built during ingestion:
//
//   words   — every sentence word and target word, index 0 is
//             reserved for <pad>
//   phrases — every full target phrase, no reserved entry
//
// New entries are appended in descending frequency order;
// equal counts keep the order in which the items were first
// seen. Both vocabularies are shared across corpora, so
// ingesting a second domain only appends new items and never
// renumbers existing ones.

use serde::Serialize;
use std::collections::HashMap;

pub const PAD_TOKEN: &str = "<pad>";

#[derive(Debug, Clone, Default, Serialize)]
pub struct Vocabulary {
    items: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Empty vocabulary (used for target phrases).
    pub fn new() -> Self {
        Self::default()
    }

    /// Vocabulary whose index 0 is the padding token (used for words).
    pub fn with_padding() -> Self {
        let mut vocab = Self::new();
        vocab.insert(PAD_TOKEN);
        vocab
    }

    /// Insert an item if unseen, returning its index either way.
    pub fn insert(&mut self, item: &str) -> usize {
        if let Some(&idx) = self.index.get(item) {
            return idx;
        }
        let idx = self.items.len();
        self.items.push(item.to_string());
        self.index.insert(item.to_string(), idx);
        idx
    }

    /// Append the items of `observed` most frequent first.
    pub fn extend_by_frequency<'a, I>(&mut self, observed: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for item in most_common(observed) {
            self.insert(&item);
        }
    }

    pub fn get(&self, item: &str) -> Option<usize> {
        self.index.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Distinct items sorted by count, descending; ties keep first-seen order.
fn most_common<'a, I>(observed: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for item in observed {
        let count = counts.entry(item).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }

    // sort_by is stable, so ties stay in first-seen order
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().map(str::to_string).collect()
}
