// ============================================================
// Layer 2 — IngestUseCase
// ============================================================
// Orchestrates dataset ingestion:
//
//   Step 1: Read every XML corpus     (Layer 4 - data)
//   Step 2: Ingest with one shared    (Layer 4 - data)
//           vocabulary, domain id =
//           position on the command line
//   Step 3: Log per-corpus diagnostics
//   Step 4: Write side files, corpus.json and vocab.json
//                                     (Layer 6 - infra)
//
// The training use case reuses steps 1–3 through `ingest_corpora`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::data::ingest::{IngestedCorpus, Ingestor};
use crate::data::loader::XmlCorpusReader;
use crate::domain::traits::CorpusSource;
use crate::infra::dataset_store::DatasetStore;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub corpora: Vec<String>,
    pub out_dir: String,
}

/// Result of ingesting several corpora through one Ingestor.
pub struct IngestedCorpora {
    /// Corpus name per domain id
    pub names:    Vec<String>,
    pub corpora:  Vec<IngestedCorpus>,
    pub ingestor: Ingestor,
}

/// Read and ingest every corpus in order; corpus `i` becomes domain `i`.
pub fn ingest_corpora(paths: &[String]) -> Result<IngestedCorpora> {
    let mut ingestor = Ingestor::new();
    let mut names    = Vec::with_capacity(paths.len());
    let mut corpora  = Vec::with_capacity(paths.len());

    for (domain, path) in paths.iter().enumerate() {
        let reader = XmlCorpusReader::new(PathBuf::from(path));
        let name   = reader.name();

        let sentences = reader.load_sentences()?;
        tracing::info!("Loaded {} sentences from '{}'", sentences.len(), path);

        let corpus = ingestor
            .ingest(&sentences, domain)
            .with_context(|| format!("Failed to ingest '{path}'"))?;
        corpus.stats.report(&name);

        names.push(name);
        corpora.push(corpus);
    }

    tracing::info!(
        "Vocabulary: {} words, {} target phrases",
        ingestor.words().len(),
        ingestor.phrases().len(),
    );
    Ok(IngestedCorpora { names, corpora, ingestor })
}

pub struct IngestUseCase {
    config: IngestConfig,
}

impl IngestUseCase {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Returns the number of examples written.
    pub fn execute(&self) -> Result<usize> {
        let cfg = &self.config;
        let IngestedCorpora { names, corpora, ingestor } = ingest_corpora(&cfg.corpora)?;

        let store = DatasetStore::new(&cfg.out_dir)?;
        for (name, corpus) in names.iter().zip(&corpora) {
            let path = store.write_side_file(name, &corpus.side_entries)?;
            tracing::info!("Side file written to '{}'", path.display());
        }
        store.save_corpora(&corpora)?;
        store.save_vocabularies(ingestor.words(), ingestor.phrases())?;

        Ok(corpora.iter().map(|c| c.examples.len()).sum())
    }
}
