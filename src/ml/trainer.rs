// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an Autodiff backend (Wgpu or NdArray)
//   - model.valid() returns the pipeline on the inner backend,
//     dropout disabled; the validation batcher uses it too
//   - argmax(1) returns [batch, 1], flattened before .equal()
//   - Every epoch: one CSV row, one checkpoint
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::{ComputeBackend, TrainConfig};
use crate::data::{
    batcher::{AspectBatch, AspectBatcher},
    dataset::{AspectDataset, SpecialTokens},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{MaskerOutput, MaskerPipeline};

pub type WgpuBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
pub type CpuBackend  = burn::backend::Autodiff<burn::backend::NdArray>;

/// Datasets plus the vocabulary facts the pipeline is built from.
pub struct TrainingData {
    pub train:       AspectDataset,
    pub val:         AspectDataset,
    pub specials:    SpecialTokens,
    pub num_domains: usize,
}

pub fn run_training(
    cfg:          &TrainConfig,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<Vec<EpochMetrics>> {
    match cfg.backend {
        ComputeBackend::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<WgpuBackend>(cfg, data, ckpt_manager, metrics, device)
        }
        ComputeBackend::Cpu => {
            let device = burn::backend::ndarray::NdArrayDevice::Cpu;
            tracing::info!("Using CPU device");
            train_loop::<CpuBackend>(cfg, data, ckpt_manager, metrics, device)
        }
    }
}

/// Running totals for one pass over a data loader.
#[derive(Debug, Default)]
struct EpochTally {
    loss_sum:        f64,
    batches:         usize,
    samples:         usize,
    sentiment_hits:  usize,
    shared_hits:     usize,
    private_hits:    usize,
    mask_pct_sum:    f64,
}

impl EpochTally {
    fn record<B: Backend>(&mut self, loss: f64, output: &MaskerOutput<B>, batch: &AspectBatch<B>) {
        self.loss_sum += loss;
        self.batches  += 1;
        self.samples  += batch.size();

        self.sentiment_hits += hits(output.sentiment_logits.clone(), batch.labels.clone());
        self.shared_hits    += hits(output.shared_domain_logits.clone(), batch.domains.clone());
        self.private_hits   += hits(output.private_domain_logits.clone(), batch.domains.clone());
        self.mask_pct_sum   += output.mask_percentage.clone().sum().into_scalar().elem::<f64>();
    }

    fn mean_loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    fn rate(&self, count: f64) -> f64 {
        if self.samples > 0 { count / self.samples as f64 } else { 0.0 }
    }
}

/// Number of rows whose argmax equals the target.
fn hits<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1] — flatten to [batch]
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted.equal(targets).int().sum().into_scalar().elem::<i64>() as usize
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       B::Device,
) -> Result<Vec<EpochMetrics>> {
    let TrainingData { train, val, specials, num_domains } = data;

    // ── Build pipeline ────────────────────────────────────────────────────────
    let encoder_cfg = cfg.encoder_config(specials.vocab_size());
    let masker_cfg  = cfg.masker_config(num_domains);
    let mut model: MaskerPipeline<B> = MaskerPipeline::new(&encoder_cfg, &masker_cfg, specials, &device);
    tracing::info!(
        "Pipeline ready: {} encoder layers, d_model={}, {} domains",
        cfg.num_layers, cfg.d_model, num_domains,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let weights = cfg.loss_weights();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(AspectBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = DataLoaderBuilder::new(AspectBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val);

    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;
    tracing::info!("Appending epoch metrics to '{}'", metrics.csv_path().display());

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(&batch, weights);

            train_loss_sum += loss.total.clone().into_scalar().elem::<f64>();
            train_batches  += 1;
            tracing::debug!(
                "batch {} | sentiment={:.4} shared={:.4} private={:.4}",
                train_batches,
                loss.sentiment.clone().into_scalar().elem::<f64>(),
                loss.shared.clone().into_scalar().elem::<f64>(),
                loss.private.clone().into_scalar().elem::<f64>(),
            );

            // Backward pass + Adam update
            let grads = loss.total.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut tally = EpochTally::default();

        for batch in val_loader.iter() {
            let (loss, output) = model_valid.forward_loss(&batch, weights);
            let loss_val = loss.total.into_scalar().elem::<f64>();
            tally.record(loss_val, &output, &batch);
        }

        let row = EpochMetrics {
            epoch,
            train_loss:         avg_train_loss,
            val_loss:           tally.mean_loss(),
            sentiment_acc:      tally.rate(tally.sentiment_hits as f64),
            shared_domain_acc:  tally.rate(tally.shared_hits as f64),
            private_domain_acc: tally.rate(tally.private_hits as f64),
            mask_percentage:    tally.rate(tally.mask_pct_sum),
        };

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | sentiment_acc={:.1}% | shared_dom_acc={:.1}% | private_dom_acc={:.1}% | masked={:.1}%",
            epoch, cfg.epochs, row.train_loss, row.val_loss,
            row.sentiment_acc * 100.0, row.shared_domain_acc * 100.0,
            row.private_domain_acc * 100.0, row.mask_percentage * 100.0,
        );

        if row.is_improvement(best_val_loss) {
            best_val_loss = row.val_loss;
            tracing::info!("New best validation loss: {:.4}", best_val_loss);
        }

        metrics.log(&row)?;
        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(row);
    }

    tracing::info!("Training complete!");
    Ok(history)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    #[test]
    fn test_hits_counts_matching_argmax() {
        let device = Default::default();
        let logits = Tensor::<TB, 2>::from_floats([[0.1, 2.0, 0.3], [5.0, 1.0, 0.0], [0.0, 0.0, 1.0]], &device);
        let targets = Tensor::<TB, 1, Int>::from_ints([1, 2, 2], &device);
        assert_eq!(hits(logits, targets), 2);
    }

    #[test]
    fn test_empty_tally_reports_nan_loss_and_zero_rates() {
        let tally = EpochTally::default();
        assert!(tally.mean_loss().is_nan());
        assert_eq!(tally.rate(3.0), 0.0);
    }
}
