// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves pipeline weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Pipeline weights (.mpk.gz)   — encoder and masker parameters
//   2. latest_epoch.json            — which epoch was last saved
//   3. train_config.json            — the full training run settings
//   4. model_manifest.json          — encoder and masker configs,
//                                     special token ids, domain names
//
// The manifest records the shape of the saved pipeline: a loader
// has to build an identical pipeline before CompactRecorder will
// accept the weights.
//
// File naming convention:
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz   ← weights after epoch 2
//     ...
//     latest_epoch.json
//     train_config.json
//     model_manifest.json
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::SpecialTokens;
use crate::ml::encoder::TransformerEncoderConfig;
use crate::ml::model::{MaskerConfig, MaskerPipeline};

/// Configs and vocabulary facts that fix the shape of the saved pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub encoder:  TransformerEncoderConfig,
    pub masker:   MaskerConfig,
    pub specials: SpecialTokens,
    /// Corpus name per domain id
    pub domains:  Vec<String>,
}

/// Manages saving of pipeline checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        // .ok() ignores the error if the directory already exists
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save pipeline weights for a given epoch and move the latest pointer.
    pub fn save_model<B: Backend>(&self, model: &MaskerPipeline<B>, epoch: usize) -> Result<()> {
        // Recorder adds the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json("train_config.json", cfg)
    }

    pub fn save_manifest(&self, manifest: &ModelManifest) -> Result<()> {
        self.write_json("model_manifest.json", manifest)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }
}


// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use std::path::Path;

    type TB = NdArray;

    fn manifest() -> ModelManifest {
        let specials = SpecialTokens::after_vocabulary(6);
        ModelManifest {
            encoder:  TransformerEncoderConfig::new(specials.vocab_size(), 8, 8, 2, 1, 16),
            masker:   MaskerConfig::new(8, 2)
                .with_hidden_size(4)
                .with_descriptor_dim(3)
                .with_hidden_lstm(2)
                .with_hops(1),
            specials,
            domains:  vec!["restaurants".into(), "laptops".into()],
        }
    }

    fn read<T: for<'de> Deserialize<'de>>(dir: &Path, name: &str) -> T {
        serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    #[test]
    fn test_save_model_moves_latest_pointer() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path().to_string_lossy());
        let m = manifest();
        let model = MaskerPipeline::<TB>::new(&m.encoder, &m.masker, m.specials, &Default::default());

        ckpt.save_model(&model, 1).unwrap();
        ckpt.save_model(&model, 2).unwrap();

        assert!(tmp.path().join("model_epoch_1.mpk.gz").is_file());
        assert!(tmp.path().join("model_epoch_2.mpk.gz").is_file());
        assert_eq!(read::<usize>(tmp.path(), "latest_epoch.json"), 2);
    }

    #[test]
    fn test_manifest_and_config_are_written_as_json() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path().to_string_lossy());

        ckpt.save_manifest(&manifest()).unwrap();
        ckpt.save_config(&TrainConfig { epochs: 7, ..TrainConfig::default() }).unwrap();

        let m: ModelManifest = read(tmp.path(), "model_manifest.json");
        assert_eq!(m.domains, vec!["restaurants", "laptops"]);
        assert_eq!(m.masker.num_domains, 2);
        assert_eq!(m.specials, SpecialTokens::after_vocabulary(6));

        let cfg: TrainConfig = read(tmp.path(), "train_config.json");
        assert_eq!(cfg.epochs, 7);
    }
}
