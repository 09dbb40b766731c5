// ============================================================
// Layer 5 — LCR-Rot-hop Sentiment Sub-network
// ============================================================
// Left-Center-Right separated network with rotatory attention,
// applied to one pooled sequence split into three contexts.
//
//   left ──► BiLSTM ─► H_l ┐
//   target ─► BiLSTM ─► H_t ├─ hop × N
//   right ─► BiLSTM ─► H_r ┘
//
//   r_tl = r_tr = mean(H_t over the target)
//   each hop:
//     target → context   r_l  = attend(H_l, r_tl)
//                        r_r  = attend(H_r, r_tr)
//                        hierarchical rescale of (r_l, r_r)
//     context → target   r_tl = attend(H_t, r_l)
//                        r_tr = attend(H_t, r_r)
//                        hierarchical rescale of (r_tl, r_tr)
//
//   output = [r_l ; r_tl ; r_tr ; r_r]     width 4 · 2h = 8h
//
// attend(H, q) scores every position with tanh(H · (W q + b)) and
// normalises over the context's own mask. An empty context yields
// a zero vector.
//
// Reference: Zheng & Xia (2018) Left-Center-Right Separated Neural
//            Network for Aspect-based Sentiment Analysis with
//            Rotatory Attention
//            Wallaart & Frasincar (2019) A Hybrid Approach for
//            Aspect-Based Sentiment Analysis Using a Lexicalized
//            Domain Ontology and Attentional Neural Models

use burn::{
    nn::{BiLstm, BiLstmConfig, Dropout, DropoutConfig, Linear},
    prelude::*,
    tensor::activation,
};

use crate::ml::contexts::ContextSplit;
use crate::ml::ops::{guarded_mean, masked_softmax, uniform_linear};

#[derive(Module, Debug)]
pub struct LcrRotHop<B: Backend> {
    lstm_left:      BiLstm<B>,
    lstm_target:    BiLstm<B>,
    lstm_right:     BiLstm<B>,
    att_left:       Linear<B>,
    att_right:      Linear<B>,
    att_target_l:   Linear<B>,
    att_target_r:   Linear<B>,
    hier_context:   Linear<B>,
    hier_target:    Linear<B>,
    dropout:        Dropout,
    hops:           usize,
    hidden:         usize,
}

impl<B: Backend> LcrRotHop<B> {
    pub fn new(d_input: usize, hidden: usize, hops: usize, dropout: f64, device: &B::Device) -> Self {
        let d = 2 * hidden;
        let lstm = || BiLstmConfig::new(d_input, hidden, true).init::<B>(device);
        Self {
            lstm_left:    lstm(),
            lstm_target:  lstm(),
            lstm_right:   lstm(),
            att_left:     uniform_linear(d, d, device),
            att_right:    uniform_linear(d, d, device),
            att_target_l: uniform_linear(d, d, device),
            att_target_r: uniform_linear(d, d, device),
            hier_context: uniform_linear(d, 1, device),
            hier_target:  uniform_linear(d, 1, device),
            dropout:      DropoutConfig::new(dropout).init(),
            hops,
            hidden,
        }
    }

    /// Width of the returned representation.
    pub fn output_dim(&self) -> usize {
        8 * self.hidden
    }

    /// → [batch, 8 · hidden]
    pub fn forward(&self, split: ContextSplit<B>) -> Tensor<B, 2> {
        let ContextSplit { left, target, right, left_mask, target_mask, right_mask } = split;

        let (h_left, _)   = self.lstm_left.forward(self.dropout.forward(left), None);
        let (h_target, _) = self.lstm_target.forward(self.dropout.forward(target), None);
        let (h_right, _)  = self.lstm_right.forward(self.dropout.forward(right), None);

        // ── Initial target representation: mean over the aspect tokens ──────
        let target_count = target_mask.clone().sum_dim(1);
        let pooled = guarded_mean(
            h_target.clone() * target_mask.clone().unsqueeze_dim::<3>(2),
            target_count,
        );

        let states = Contexts { h_left, h_target, h_right, left_mask, target_mask, right_mask };

        let mut reps = self.hop(&states, pooled.clone(), pooled);
        for _ in 1..self.hops {
            let [_, r_tl, r_tr, _] = reps;
            reps = self.hop(&states, r_tl, r_tr);
        }

        Tensor::cat(Vec::from(reps), 1)
    }

    /// One rotatory round. Returns `[r_l, r_tl, r_tr, r_r]`.
    fn hop(&self, s: &Contexts<B>, r_tl: Tensor<B, 2>, r_tr: Tensor<B, 2>) -> [Tensor<B, 2>; 4] {
        // ── Target-to-context ─────────────────────────────────────────────────
        let left  = attend(&self.att_left,  s.h_left.clone(),  s.left_mask.clone(),  r_tl);
        let right = attend(&self.att_right, s.h_right.clone(), s.right_mask.clone(), r_tr);
        let (r_l, r_r) = hierarchical(&self.hier_context, left, right);

        // ── Context-to-target ─────────────────────────────────────────────────
        let tl = attend(&self.att_target_l, s.h_target.clone(), s.target_mask.clone(), r_l.clone());
        let tr = attend(&self.att_target_r, s.h_target.clone(), s.target_mask.clone(), r_r.clone());
        let (r_tl, r_tr) = hierarchical(&self.hier_target, tl, tr);

        [r_l, r_tl, r_tr, r_r]
    }
}

/// BiLSTM states of the three contexts with their masks.
struct Contexts<B: Backend> {
    h_left:      Tensor<B, 3>,
    h_target:    Tensor<B, 3>,
    h_right:     Tensor<B, 3>,
    left_mask:   Tensor<B, 2>,
    target_mask: Tensor<B, 2>,
    right_mask:  Tensor<B, 2>,
}

/// Bilinear attention of `query` over the masked positions of `states`.
///
/// states: [B, L, d], mask: [B, L], query: [B, d] → [B, d]
fn attend<B: Backend>(
    projection: &Linear<B>,
    states:     Tensor<B, 3>,
    mask:       Tensor<B, 2>,
    query:      Tensor<B, 2>,
) -> Tensor<B, 2> {
    let [batch, len, dim] = states.dims();
    let q = projection.forward(query).unsqueeze_dim::<3>(1);
    let scores = activation::tanh((states.clone() * q).sum_dim(2));

    let none = Tensor::<B, 2>::zeros([batch, len], &states.device());
    let weights = masked_softmax(scores, mask, none);

    (states * weights).sum_dim(1).reshape([batch, dim])
}

/// Rescales a pair of representations by a softmax over their scores.
fn hierarchical<B: Backend>(
    scorer: &Linear<B>,
    a:      Tensor<B, 2>,
    b:      Tensor<B, 2>,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [batch, dim] = a.dims();
    let pair = Tensor::stack::<3>(vec![a, b], 1);
    let scores = activation::tanh(scorer.forward(pair.clone()));
    let weights = activation::softmax(scores, 1);
    let scaled = pair * weights;

    let first  = scaled.clone().slice([0..batch, 0..1, 0..dim]).reshape([batch, dim]);
    let second = scaled.slice([0..batch, 1..2, 0..dim]).reshape([batch, dim]);
    (first, second)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::contexts::split_contexts;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn inputs(start: i64, end: i64) -> ContextSplit<TB> {
        let device = Default::default();
        let seq = Tensor::<TB, 3>::random(
            [2, 8, 6],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let spans = Tensor::<TB, 2, Int>::from_ints([[start, end], [start, end]], &device);
        let pad = Tensor::<TB, 1>::zeros([6], &device);
        let mask = Tensor::<TB, 2>::from_floats(
            [
                [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
                [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            ],
            &device,
        );
        split_contexts(seq, spans, pad, mask)
    }

    #[test]
    fn test_output_width_is_eight_times_hidden() {
        let lcr = LcrRotHop::<TB>::new(6, 5, 3, 0.0, &Default::default());
        let out = lcr.forward(inputs(2, 4));
        assert_eq!(lcr.output_dim(), 40);
        assert_eq!(out.dims(), [2, 40]);
    }

    #[test]
    fn test_empty_left_context_is_finite() {
        let lcr = LcrRotHop::<TB>::new(6, 4, 2, 0.0, &Default::default());
        let out = lcr.forward(inputs(1, 3)).into_data().to_vec::<f32>().unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
        // r_l is the first block of 2h values; nothing to attend to → zero
        assert!(out[..8].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_hierarchical_weights_sum_to_one() {
        let device = Default::default();
        let scorer = uniform_linear::<TB>(3, 1, &device);
        let a = Tensor::<TB, 2>::ones([1, 3], &device);
        let (x, y) = hierarchical(&scorer, a.clone(), a);
        // both inputs are ones, so the outputs are the weights themselves
        let total = (x + y).into_data().to_vec::<f32>().unwrap();
        for v in total {
            assert!((v - 1.0).abs() < 1e-5);
        }
    }
}
