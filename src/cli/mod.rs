// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `ingest` — turns XML corpora into side files, corpus.json
//                 and vocab.json
//   2. `train`  — ingests the corpora and trains BERTMasker-plus,
//                 one domain per corpus

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, IngestArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "bertmasker-plus",
    version = "0.1.0",
    about = "Domain-adaptive aspect-based sentiment classification with domain-specific masking."
)]
pub struct Cli {
    /// The subcommand to run (ingest or train)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Ingest(args) => run_ingest(args),
            Commands::Train(args)  => run_train(args),
        }
    }
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    use crate::application::ingest_use_case::IngestUseCase;

    tracing::info!("Ingesting {} corpora into '{}'", args.corpus.len(), args.out_dir);

    let written = IngestUseCase::new(args.into()).execute()?;
    println!("Ingestion complete. {written} examples written.");
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on {} domains", args.corpus.len());

    // Convert CLI args → application config (separates presentation from domain)
    let history = TrainUseCase::new(args.into()).execute()?;

    match history.last() {
        Some(last) => println!(
            "Training complete. Final sentiment accuracy {:.1}%, checkpoints saved.",
            last.sentiment_acc * 100.0,
        ),
        None => println!("Training complete. No epochs were run."),
    }
    Ok(())
}
