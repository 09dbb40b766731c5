// ============================================================
// Layer 5 — Context Splitter
// ============================================================
// Partitions an encoded sequence around the aspect span:
//
//   [CLS] w1 w2 │ t1 t2 │ w5 w6 [SEP] <pad> <pad>
//     0   1  2  │  3  4 │  5  6   7     8     9
//         left  │ target│ right
//
//   left   = [1, start)
//   target = [start, end)
//   right  = [end, last)     last = separator position
//
// Every partition keeps the full sequence length; positions that
// belong to another partition (or to [CLS]/[SEP]/padding) hold the
// [PAD] embedding and are masked out.

use burn::prelude::*;

use crate::ml::ops::{complement, positions};

#[derive(Debug, Clone)]
pub struct ContextSplit<B: Backend> {
    pub left:        Tensor<B, 3>,
    pub target:      Tensor<B, 3>,
    pub right:       Tensor<B, 3>,
    pub left_mask:   Tensor<B, 2>,
    pub target_mask: Tensor<B, 2>,
    pub right_mask:  Tensor<B, 2>,
}

/// seq: [B, L, D], spans: [B, 2] (start, end exclusive), pad_embedding: [D], mask: [B, L]
pub fn split_contexts<B: Backend>(
    seq:           Tensor<B, 3>,
    spans:         Tensor<B, 2, Int>,
    pad_embedding: Tensor<B, 1>,
    mask:          Tensor<B, 2>,
) -> ContextSplit<B> {
    let [batch, len, dim] = seq.dims();
    let pos = positions::<B>(batch, len, &seq.device());

    let start = spans.clone().slice([0..batch, 0..1]).float().expand([batch, len]);
    let end   = spans.slice([0..batch, 1..2]).float().expand([batch, len]);
    let last  = mask.clone().sum_dim(1).sub_scalar(1.0).expand([batch, len]);

    // ── Partition masks ───────────────────────────────────────────────────────
    let left_mask = pos.clone().greater_equal_elem(1.0).float()
        * pos.clone().lower(start.clone()).float()
        * mask.clone();
    let target_mask = pos.clone().greater_equal(start).float()
        * pos.clone().lower(end.clone()).float()
        * mask.clone();
    let right_mask = pos.clone().greater_equal(end).float()
        * pos.lower(last).float()
        * mask;

    // ── Fill everything outside a partition with [PAD] ────────────────────────
    let pad = pad_embedding.reshape([1, 1, dim]).expand([batch, len, dim]);
    let fill = |m: &Tensor<B, 2>| {
        let keep = m.clone().unsqueeze_dim::<3>(2);
        seq.clone() * keep.clone() + pad.clone() * complement(keep)
    };

    ContextSplit {
        left:   fill(&left_mask),
        target: fill(&target_mask),
        right:  fill(&right_mask),
        left_mask,
        target_mask,
        right_mask,
    }
}
