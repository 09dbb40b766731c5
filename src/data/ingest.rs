// ============================================================
// Layer 4 — Corpus Ingestion
// ============================================================
// Turns annotated sentences into AspectExamples plus the
// three-line side file entries.
//
// Two passes over the corpus:
//
//   Pass 1  tokenise every sentence and every explicit target,
//           count conflicts and implicit targets, track the
//           longest sentence / target, then extend the shared
//           word and phrase vocabularies by frequency
//
//   Pass 2  for every opinion that survives the filters:
//             - map the sentence words to indices
//             - locate the aspect among the words
//             - compute distance features 1 - d/len
//             - build the "$T$" side file entry
//
// Opinions dropped on the way:
//   conflict polarity       → counted in `conflicts`
//   NULL / missing target   → counted in `implicit`
//   aspect not locatable    → counted in `unlocated`
//
// An unknown polarity string aborts ingestion.

use serde::{Deserialize, Serialize};

use crate::data::error::IngestError;
use crate::data::placeholder::{replace_nth_occurrence, TARGET_PLACEHOLDER};
use crate::data::text::TextNormalizer;
use crate::data::vocab::Vocabulary;
use crate::domain::opinion::{AspectExample, Polarity};
use crate::domain::sentence::AnnotatedSentence;

/// One example as written to the plain-text side file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEntry {
    /// Lowercased sentence with the target occurrence replaced by `$T$`
    pub sentence: String,
    /// Lowercased target text
    pub target: String,
    pub label: i8,
}

impl SideEntry {
    /// The three lines written for this example.
    pub fn lines(&self) -> [String; 3] {
        [self.sentence.clone(), self.target.clone(), self.label.to_string()]
    }
}

/// Skip-and-count diagnostics for one corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub aspects: usize,
    pub implicit: usize,
    pub conflicts: usize,
    pub unlocated: usize,
    pub negative: usize,
    pub neutral: usize,
    pub positive: usize,
}

impl IngestStats {
    fn record(&mut self, polarity: Polarity) {
        self.aspects += 1;
        match polarity {
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
            Polarity::Positive => self.positive += 1,
        }
    }

    fn opinions_seen(&self) -> usize {
        self.aspects + self.implicit + self.conflicts + self.unlocated
    }

    /// Log the corpus-level summary once.
    pub fn report(&self, corpus: &str) {
        let seen = self.opinions_seen().max(1) as f64;
        let aspects = self.aspects.max(1) as f64;

        tracing::info!("Read {} aspects from {}", self.aspects, corpus);
        tracing::info!(
            "Implicit: {} ({:.2}%), conflicts: {} ({:.2}%), unlocated: {}",
            self.implicit,
            100.0 * self.implicit as f64 / seen,
            self.conflicts,
            100.0 * self.conflicts as f64 / seen,
            self.unlocated,
        );
        tracing::info!(
            "Positive: {} ({:.1}%) | Negative: {} ({:.1}%) | Neutral: {} ({:.1}%)",
            self.positive,
            100.0 * self.positive as f64 / aspects,
            self.negative,
            100.0 * self.negative as f64 / aspects,
            self.neutral,
            100.0 * self.neutral as f64 / aspects,
        );
    }
}

/// Everything produced from one corpus file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestedCorpus {
    pub domain: usize,
    pub examples: Vec<AspectExample>,
    pub side_entries: Vec<SideEntry>,
    pub max_sentence_length: usize,
    pub max_target_length: usize,
    pub stats: IngestStats,
}

/// Owns the vocabularies shared by every corpus ingested through it.
pub struct Ingestor {
    normalizer: TextNormalizer,
    words: Vocabulary,
    phrases: Vocabulary,
}

impl Ingestor {
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            words: Vocabulary::with_padding(),
            phrases: Vocabulary::new(),
        }
    }

    pub fn words(&self) -> &Vocabulary {
        &self.words
    }

    pub fn phrases(&self) -> &Vocabulary {
        &self.phrases
    }

    /// Ingest one corpus, tagging every example with `domain`.
    pub fn ingest(
        &mut self,
        sentences: &[AnnotatedSentence],
        domain: usize,
    ) -> Result<IngestedCorpus, IngestError> {
        let mut out = IngestedCorpus { domain, ..Default::default() };

        // ── Pass 1: vocabulary and corpus maxima ─────────────────────────────
        let mut tokenized: Vec<Vec<String>> = Vec::with_capacity(sentences.len());
        let mut target_words: Vec<String> = Vec::new();
        let mut target_phrases: Vec<String> = Vec::new();

        for sentence in sentences {
            let tokens = self.normalizer.tokenize(&sentence.text)?;
            out.max_sentence_length = out.max_sentence_length.max(tokens.len());

            for opinion in &sentence.opinions {
                if opinion.is_conflict() {
                    out.stats.conflicts += 1;
                    continue;
                }
                match opinion.explicit_target() {
                    Some(target) => {
                        let t_tokens = self.normalizer.tokenize(target)?;
                        out.max_target_length = out.max_target_length.max(t_tokens.len());
                        target_phrases.push(t_tokens.join(" "));
                        target_words.extend(t_tokens);
                    }
                    None => out.stats.implicit += 1,
                }
            }
            tokenized.push(tokens);
        }

        self.words.extend_by_frequency(
            tokenized
                .iter()
                .flatten()
                .chain(target_words.iter())
                .map(String::as_str),
        );
        self.phrases
            .extend_by_frequency(target_phrases.iter().map(String::as_str));

        // ── Pass 2: examples and side file entries ───────────────────────────
        for (sentence, tokens) in sentences.iter().zip(&tokenized) {
            if tokens.is_empty() {
                continue;
            }
            // Every word was inserted during pass 1.
            let token_ids: Vec<usize> = tokens
                .iter()
                .map(|w| self.words.get(w).unwrap_or(0))
                .collect();

            for opinion in &sentence.opinions {
                if opinion.is_conflict() {
                    continue;
                }
                let Some(target) = opinion.explicit_target() else {
                    continue;
                };

                let polarity: Polarity = opinion.polarity.parse()?;
                let t_tokens = self.normalizer.tokenize(target)?;

                let Some(span) = locate_aspect(tokens, &t_tokens) else {
                    tracing::warn!("Aspect '{}' not found in '{}'", target, sentence.text);
                    out.stats.unlocated += 1;
                    continue;
                };

                let phrase = t_tokens.join(" ");
                let target_index = self.phrases.get(&phrase).unwrap_or_default();

                out.side_entries.push(SideEntry {
                    sentence: replace_nth_occurrence(
                        &sentence.text.to_lowercase(),
                        &target.to_lowercase(),
                        TARGET_PLACEHOLDER,
                        opinion.occurrence,
                    ),
                    target: target.to_lowercase(),
                    label: polarity.label(),
                });

                out.examples.push(AspectExample {
                    distances: distance_features(tokens.len(), span),
                    token_ids: token_ids.clone(),
                    target_index,
                    aspect_span: span,
                    polarity,
                    domain,
                });
                out.stats.record(polarity);
            }
        }

        Ok(out)
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new()
    }
}

/// First window of `aspect.len()` tokens equal to, or containing, the aspect.
/// Returns the `[start, end)` token span.
pub fn locate_aspect(tokens: &[String], aspect: &[String]) -> Option<(usize, usize)> {
    let n = aspect.len();
    if n == 0 || n > tokens.len() {
        return None;
    }
    let needle = aspect.join(" ");

    tokens
        .windows(n)
        .position(|group| {
            let joined = group.join(" ");
            joined == needle || joined.contains(&needle)
        })
        .map(|start| (start, start + n))
}

/// `1 - d/len` per token, `d` being the token distance to the aspect span.
pub fn distance_features(len: usize, span: (usize, usize)) -> Vec<f32> {
    let (start, end) = span;
    (0..len)
        .map(|i| {
            let d = if i < start {
                start - i
            } else if i >= end {
                i + 1 - end
            } else {
                0
            };
            1.0 - d as f32 / len as f32
        })
        .collect()
}
