// ============================================================
// Layer 4 — Aspect Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<AspectSample>
// into tensors.
//
//   input_ids      [batch, max_length]  Int
//   attention_mask [batch, max_length]  Int   1 = real token
//   target_spans   [batch, 2]           Int   (start, end) exclusive end
//   domains        [batch]              Int
//   labels         [batch]              Int   polarity class 0..3
//
// All samples are padded to the same length beforehand, so the
// flat Vec → reshape trick is enough here.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::AspectSample;

#[derive(Debug, Clone)]
pub struct AspectBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    pub target_spans:   Tensor<B, 2, Int>,
    pub domains:        Tensor<B, 1, Int>,
    pub labels:         Tensor<B, 1, Int>,
}

impl<B: Backend> AspectBatch<B> {
    pub fn size(&self) -> usize {
        self.labels.dims()[0]
    }
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct AspectBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> AspectBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<AspectSample, AspectBatch<B>> for AspectBatcher<B> {
    fn batch(&self, items: Vec<AspectSample>) -> AspectBatch<B> {
        let batch_size = items.len();
        // All sequences have the same length (pre-padded)
        let seq_len    = items[0].input_ids.len();

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let spans_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| [s.target_span.0 as i32, s.target_span.1 as i32])
            .collect();

        let domains: Vec<i32> = items.iter().map(|s| s.domain as i32).collect();
        let labels:  Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let target_spans = Tensor::<B, 1, Int>::from_ints(
            spans_flat.as_slice(), &self.device
        ).reshape([batch_size, 2]);

        AspectBatch {
            input_ids,
            attention_mask,
            target_spans,
            domains: Tensor::<B, 1, Int>::from_ints(domains.as_slice(), &self.device),
            labels:  Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}
