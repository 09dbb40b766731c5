use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort corpus ingestion.
///
/// Degraded-but-recoverable cases (a target occurrence that cannot be
/// found, an aspect that cannot be located among the tokens) are not
/// errors; they are logged and counted by the ingestor instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("corpus file '{0}' not found")]
    CorpusNotFound(PathBuf),

    #[error("cannot read corpus '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in '{path}': {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("sentence without a <text> element in '{0}'")]
    MissingText(PathBuf),

    #[error("invalid {name} attribute value '{value}'")]
    InvalidAttribute { name: &'static str, value: String },

    #[error("unknown polarity label '{0}'")]
    UnknownPolarity(String),

    #[error("tokenisation failed: {0}")]
    Tokenize(String),
}
