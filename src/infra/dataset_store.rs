// ============================================================
// Layer 6 — Dataset Store
// ============================================================
// Persists everything ingestion produces:
//
//   out_dir/
//     <corpus>.txt   ← side file, three lines per example:
//                        sentence with $T$
//                        target
//                        label (-1 / 0 / 1)
//     corpus.json    ← ingested corpora (examples, max lengths,
//                      diagnostics)
//     vocab.json     ← word and target-phrase vocabularies
//
// Embedding row i of a trained encoder belongs to word i of
// vocab.json.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use crate::data::ingest::{IngestedCorpus, SideEntry};
use crate::data::vocab::Vocabulary;

const CORPUS_FILE: &str = "corpus.json";
const VOCAB_FILE:  &str = "vocab.json";

#[derive(Serialize)]
struct StoredVocabularies<'a> {
    words:   &'a Vocabulary,
    phrases: &'a Vocabulary,
}

pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    /// Opens `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Write `<name>.txt` and return its path.
    pub fn write_side_file(&self, name: &str, entries: &[SideEntry]) -> Result<PathBuf> {
        let path = self.dir.join(format!("{name}.txt"));
        let file = fs::File::create(&path)
            .with_context(|| format!("Cannot create side file '{}'", path.display()))?;

        let mut out = BufWriter::new(file);
        for entry in entries {
            for line in entry.lines() {
                writeln!(out, "{line}")?;
            }
        }
        out.flush()?;

        tracing::debug!("Wrote {} entries to '{}'", entries.len(), path.display());
        Ok(path)
    }

    pub fn save_corpora(&self, corpora: &[IngestedCorpus]) -> Result<()> {
        self.write_json(CORPUS_FILE, &corpora)
    }

    pub fn save_vocabularies(&self, words: &Vocabulary, phrases: &Vocabulary) -> Result<()> {
        self.write_json(VOCAB_FILE, &StoredVocabularies { words, phrases })
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }
}
