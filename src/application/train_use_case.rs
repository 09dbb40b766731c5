// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Ingest every corpus          (Layer 4 - data)
//   Step 2: Append [CLS] [SEP] [MASK]    (Layer 4 - data)
//           to the word vocabulary
//   Step 3: Encode padded samples        (Layer 4 - data)
//   Step 4: Domain-stratified split      (Layer 4 - data)
//   Step 5: Save config, manifest and    (Layer 6 - infra)
//           vocabularies
//   Step 6: Run training loop            (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::application::ingest_use_case::{ingest_corpora, IngestedCorpora};
use crate::data::dataset::{AspectDataset, AspectSample, SpecialTokens};
use crate::data::splitter::split_by_domain;
use crate::infra::{
    checkpoint::{CheckpointManager, ModelManifest},
    dataset_store::DatasetStore,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::encoder::TransformerEncoderConfig;
use crate::ml::model::{LossWeights, MaskerConfig};
use crate::ml::trainer::{run_training, TrainingData};

/// Where the training loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeBackend {
    /// GPU through wgpu
    Wgpu,
    /// CPU through ndarray
    Cpu,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run.
// Serialisable so it is saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// One XML corpus per domain, in domain-id order
    pub corpora:        Vec<String>,
    pub checkpoint_dir: String,
    pub backend:        ComputeBackend,

    pub max_length:     usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub train_fraction: f64,
    pub seed:           u64,

    // Encoder
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub encoder_dropout: f64,

    // Masker
    pub hidden_size:    usize,
    pub descriptor_dim: usize,
    pub temperature:    f64,
    pub alpha:          f64,
    pub masking:        f64,
    pub hidden_lstm:    usize,
    pub hops:           usize,
    pub dropout:        f64,

    // Loss
    pub lambda_shared:  f64,
    pub lambda_private: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpora:         Vec::new(),
            checkpoint_dir:  "checkpoints".to_string(),
            backend:         ComputeBackend::Wgpu,
            max_length:      128,
            batch_size:      16,
            epochs:          10,
            lr:              2e-5,
            train_fraction:  0.8,
            seed:            42,
            d_model:         256,
            num_heads:       8,
            num_layers:      6,
            d_ff:            1024,
            encoder_dropout: 0.1,
            hidden_size:     128,
            descriptor_dim:  100,
            temperature:     0.5,
            alpha:           1.0,
            masking:         0.1,
            hidden_lstm:     64,
            hops:            3,
            dropout:         0.1,
            lambda_shared:   1.0,
            lambda_private:  1.0,
        }
    }
}

impl TrainConfig {
    pub fn encoder_config(&self, vocab_size: usize) -> TransformerEncoderConfig {
        TransformerEncoderConfig::new(
            vocab_size, self.max_length, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_dropout(self.encoder_dropout)
    }

    pub fn masker_config(&self, num_domains: usize) -> MaskerConfig {
        MaskerConfig::new(self.d_model, num_domains)
            .with_hidden_size(self.hidden_size)
            .with_descriptor_dim(self.descriptor_dim)
            .with_temperature(self.temperature)
            .with_alpha(self.alpha)
            .with_masking(self.masking)
            .with_hidden_lstm(self.hidden_lstm)
            .with_hops(self.hops)
            .with_dropout(self.dropout)
    }

    pub fn loss_weights(&self) -> LossWeights {
        LossWeights { shared: self.lambda_shared, private: self.lambda_private }
    }

    fn validate(&self) -> Result<()> {
        if self.corpora.is_empty() {
            bail!("At least one corpus is required");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.max_length < 3 {
            bail!("max_length must leave room for [CLS], one word and [SEP]");
        }
        if self.num_heads == 0 {
            bail!("num_heads must be at least 1");
        }
        if self.d_model % self.num_heads != 0 {
            bail!("d_model ({}) must be divisible by num_heads ({})", self.d_model, self.num_heads);
        }
        if !(0.0..=1.0).contains(&self.train_fraction) {
            bail!("train_fraction must be within [0, 1], got {}", self.train_fraction);
        }
        if self.temperature <= 0.0 {
            bail!("temperature must be positive, got {}", self.temperature);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Ingest every corpus, one domain each ──────────────────────
        let IngestedCorpora { names, corpora, ingestor } = ingest_corpora(&cfg.corpora)?;

        // ── Step 2: Structural tokens after the last word ─────────────────────
        let specials = SpecialTokens::after_vocabulary(ingestor.words().len());
        tracing::info!("Encoder vocabulary: {} entries", specials.vocab_size());

        // ── Step 3: Padded encoder samples ────────────────────────────────────
        let mut samples   = Vec::new();
        let mut truncated = 0usize;
        for example in corpora.iter().flat_map(|c| &c.examples) {
            match AspectSample::encode(example, specials, cfg.max_length) {
                Some(sample) => samples.push(sample),
                None         => truncated += 1,
            }
        }
        if truncated > 0 {
            tracing::warn!(
                "{} examples dropped: aspect beyond max_length={}",
                truncated, cfg.max_length,
            );
        }
        if samples.is_empty() {
            bail!("No training examples left after ingestion");
        }

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) =
            split_by_domain(samples, cfg.train_fraction, cfg.seed, |s| s.domain);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 5: Persist everything inference needs ────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_manifest(&ModelManifest {
            encoder:  cfg.encoder_config(specials.vocab_size()),
            masker:   cfg.masker_config(names.len()),
            specials,
            domains:  names.clone(),
        })?;
        DatasetStore::new(&cfg.checkpoint_dir)?
            .save_vocabularies(ingestor.words(), ingestor.phrases())?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Training loop (Layer 5) ───────────────────────────────────
        let data = TrainingData {
            train:       AspectDataset::new(train_samples),
            val:         AspectDataset::new(val_samples),
            specials,
            num_domains: names.len(),
        };
        run_training(cfg, data, &ckpt_manager, &metrics)
    }
}
