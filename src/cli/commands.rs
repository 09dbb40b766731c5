// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `ingest` and `train`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)

use clap::{Args, Subcommand};

use crate::application::ingest_use_case::IngestConfig;
use crate::application::train_use_case::{ComputeBackend, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse XML corpora and write side files, corpus.json and vocab.json
    Ingest(IngestArgs),

    /// Train BERTMasker-plus, one domain per corpus
    Train(TrainArgs),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// SemEval-style XML corpus; repeat for several domains
    #[arg(long, required = true)]
    pub corpus: Vec<String>,

    /// Directory receiving the ingestion outputs
    #[arg(long, default_value = "data/ingested")]
    pub out_dir: String,
}

impl From<IngestArgs> for IngestConfig {
    fn from(a: IngestArgs) -> Self {
        IngestConfig { corpora: a.corpus, out_dir: a.out_dir }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// XML corpus per domain, in domain-id order
    #[arg(long, required = true)]
    pub corpus: Vec<String>,

    /// Directory for checkpoints, configs, vocabularies and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Train on the CPU (ndarray) instead of the GPU (wgpu)
    #[arg(long)]
    pub cpu: bool,

    /// Sequence length including [CLS] and [SEP]
    #[arg(long, default_value_t = 128)]
    pub max_length: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// Share of every domain used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed of the train/validation split and loader shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Hidden dimension of the encoder; d_model must be divisible by num_heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the encoder feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub encoder_dropout: f64,

    /// Width of the token-scoring FFN and the domain classifiers
    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    /// Width of each domain descriptor
    #[arg(long, default_value_t = 100)]
    pub descriptor_dim: usize,

    /// Gumbel-softmax temperature; must be positive
    #[arg(long, default_value_t = 0.5)]
    pub temperature: f64,

    /// Gradient reversal strength
    #[arg(long, default_value_t = 1.0)]
    pub alpha: f64,

    /// Offset subtracted from the relaxed gate before rounding
    #[arg(long, default_value_t = 0.1)]
    pub masking: f64,

    /// Hidden size of each LSTM direction in LCR-Rot-hop
    #[arg(long, default_value_t = 64)]
    pub hidden_lstm: usize,

    /// Rotatory attention iterations
    #[arg(long, default_value_t = 3)]
    pub hops: usize,

    /// Dropout inside LCR-Rot-hop
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Weight of the shared (adversarial) domain loss
    #[arg(long, default_value_t = 1.0)]
    pub lambda_shared: f64,

    /// Weight of the private domain loss
    #[arg(long, default_value_t = 1.0)]
    pub lambda_private: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpora:         a.corpus,
            checkpoint_dir:  a.checkpoint_dir,
            backend:         if a.cpu { ComputeBackend::Cpu } else { ComputeBackend::Wgpu },
            max_length:      a.max_length,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            train_fraction:  a.train_fraction,
            seed:            a.seed,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            encoder_dropout: a.encoder_dropout,
            hidden_size:     a.hidden_size,
            descriptor_dim:  a.descriptor_dim,
            temperature:     a.temperature,
            alpha:           a.alpha,
            masking:         a.masking,
            hidden_lstm:     a.hidden_lstm,
            hops:            a.hops,
            dropout:         a.dropout,
            lambda_shared:   a.lambda_shared,
            lambda_private:  a.lambda_private,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use crate::application::train_use_case::{ComputeBackend, TrainConfig};
    use clap::Parser;

    use super::Commands;

    #[test]
    fn test_train_args_map_to_config() {
        let cli = Cli::try_parse_from([
            "bertmasker-plus", "train",
            "--corpus", "hotels.xml", "--corpus", "books.xml",
            "--cpu", "--hops", "2", "--masking", "0.2",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else {
            panic!("expected the train subcommand");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.corpora, vec!["hotels.xml", "books.xml"]);
        assert_eq!(cfg.backend, ComputeBackend::Cpu);
        assert_eq!(cfg.hops, 2);
        assert_eq!(cfg.masking, 0.2);
        assert_eq!(cfg.temperature, 0.5);
    }

    #[test]
    fn test_corpus_is_required() {
        assert!(Cli::try_parse_from(["bertmasker-plus", "ingest"]).is_err());
    }
}
