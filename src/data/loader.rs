// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads SemEval-style review corpora (book, hotel, ...) using
// roxmltree.
//
// The document structure looks like:
//   sentences
//     └── sentence
//           ├── text                (the review sentence)
//           └── Opinions
//                 └── Opinion       (target, polarity, occurrence)
//
// Every <sentence> anywhere in the tree is visited in document
// order. Opinions are read from every <Opinions> element below
// the sentence; nothing is filtered here.

use anyhow::Result;
use std::{fs, path::{Path, PathBuf}};

use crate::data::error::IngestError;
use crate::domain::sentence::{AnnotatedSentence, RawOpinion};
use crate::domain::traits::CorpusSource;

/// Loads annotated sentences from one XML corpus file.
/// Implements the CorpusSource trait from Layer 3.
pub struct XmlCorpusReader {
    path: PathBuf,
}

impl XmlCorpusReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse the file, returning typed ingestion errors.
    pub fn read(&self) -> Result<Vec<AnnotatedSentence>, IngestError> {
        if !self.path.is_file() {
            return Err(IngestError::CorpusNotFound(self.path.clone()));
        }

        let xml = fs::read_to_string(&self.path).map_err(|source| IngestError::Io {
            path: self.path.clone(),
            source,
        })?;

        let sentences = parse_corpus(&xml, &self.path)?;
        tracing::debug!(
            "Parsed {} sentences from '{}'",
            sentences.len(),
            self.path.display()
        );
        Ok(sentences)
    }
}

impl CorpusSource for XmlCorpusReader {
    fn load_sentences(&self) -> Result<Vec<AnnotatedSentence>> {
        Ok(self.read()?)
    }

    /// File stem, e.g. "restaurants" for "data/restaurants.xml".
    fn name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Parse corpus XML held in memory. `origin` is only used in error messages.
pub fn parse_corpus(xml: &str, origin: &Path) -> Result<Vec<AnnotatedSentence>, IngestError> {
    let doc = roxmltree::Document::parse(xml).map_err(|source| IngestError::Xml {
        path: origin.to_path_buf(),
        source,
    })?;

    let mut sentences = Vec::new();

    for sentence in doc.descendants().filter(|n| n.has_tag_name("sentence")) {
        let text = sentence
            .children()
            .find(|n| n.has_tag_name("text"))
            .ok_or_else(|| IngestError::MissingText(origin.to_path_buf()))?
            .text()
            .unwrap_or_default()
            .to_string();

        let mut opinions = Vec::new();
        for group in sentence.descendants().filter(|n| n.has_tag_name("Opinions")) {
            for opinion in group.children().filter(|n| n.has_tag_name("Opinion")) {
                opinions.push(read_opinion(&opinion)?);
            }
        }

        sentences.push(AnnotatedSentence::new(text, opinions));
    }

    Ok(sentences)
}

fn read_opinion(node: &roxmltree::Node<'_, '_>) -> Result<RawOpinion, IngestError> {
    // Missing occurrence means the first one.
    let occurrence = match node.attribute("occurrence") {
        None => 1,
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| IngestError::InvalidAttribute {
            name: "occurrence",
            value: raw.to_string(),
        })?,
    };

    Ok(RawOpinion::new(
        node.attribute("target").map(str::to_string),
        node.attribute("polarity").unwrap_or_default(),
        occurrence,
    ))
}
