// ============================================================
// Layer 5 — Shared / Private Representation Extractor
// ============================================================
// Decides, token by token, what is domain-specific (private)
// and what carries over between domains (shared).
//
//   ── Step 1 ── score each token against its own and the mean
//               descriptor, gate → P, P0 = P[Own]
//   ── Step 2 ── structural mask Z ([CLS], [SEP])
//   ── Step 3 ── E' = (1 - P0) E + P0 e_mask, Z positions keep E
//   ── Step 4 ── re-encode E', sum the last four layers,
//               shared representation = position 0
//   ── Step 5 ── gradient reversal → shared domain classifier
//   ── Step 6 ── private summary = masked mean of H over P0
//   ── Step 7 ── private sequence = H weighted by its attention
//               to the summary, restricted to gated tokens
//   ── Step 8 ── mask percentage = gated / eligible tokens
//
// Masked tokens feed the private branch; the re-encoded sentence
// without them feeds the shared branch, where the reversed
// gradient pushes the encoder towards domain-invariant features.

use burn::{
    nn::Linear,
    prelude::*,
    tensor::activation,
};

use crate::ml::classifiers::DomainClassifier;
use crate::ml::descriptors::DescriptorBranch;
use crate::ml::encoder::{sum_last_layers, ContextEncoder, SUMMED_LAYERS};
use crate::ml::gate::{sample_gumbel, RelaxedBinaryGate};
use crate::ml::ops::{
    complement, guarded_mean, masked_softmax, structural_mask, uniform_linear, GradientReversal,
};

#[derive(Debug, Clone)]
pub struct ExtractorInput<B: Backend> {
    /// Descriptor-augmented tokens: [B, L, 2, D + W]
    pub combined:       Tensor<B, 4>,
    /// Summed encoder layers H: [B, L, D]
    pub hidden:         Tensor<B, 3>,
    /// Input embeddings E: [B, L, D]
    pub embeddings:     Tensor<B, 3>,
    /// Real tokens: [B, L]
    pub mask:           Tensor<B, 2>,
    /// Embedding of the [MASK] token: [D]
    pub mask_embedding: Tensor<B, 1>,
}

#[derive(Debug, Clone)]
pub struct ExtractorOutput<B: Backend> {
    pub shared_logits:     Tensor<B, 2>,
    pub shared_sequence:   Tensor<B, 3>,
    pub private_logits:    Tensor<B, 2>,
    pub private_sequence:  Tensor<B, 3>,
    pub mask_percentage:   Tensor<B, 1>,
    pub masked_embeddings: Tensor<B, 3>,
}

#[derive(Module, Debug)]
pub struct SharedPrivateExtractor<B: Backend> {
    score_hidden: Linear<B>,
    score_output: Linear<B>,
    gate:         RelaxedBinaryGate,
    reversal:     GradientReversal,
    shared_dc:    DomainClassifier<B>,
    private_dc:   DomainClassifier<B>,
}

impl<B: Backend> SharedPrivateExtractor<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hidden_dim:     usize,
        descriptor_dim: usize,
        hidden_size:    usize,
        num_domains:    usize,
        temperature:    f64,
        masking:        f64,
        alpha:          f64,
        device:         &B::Device,
    ) -> Self {
        Self {
            score_hidden: uniform_linear(hidden_dim + descriptor_dim, hidden_size, device),
            score_output: uniform_linear(hidden_size, 1, device),
            gate:         RelaxedBinaryGate::new(temperature, masking),
            reversal:     GradientReversal::new(alpha),
            shared_dc:    DomainClassifier::new(hidden_dim, hidden_size, num_domains, device),
            private_dc:   DomainClassifier::new(hidden_dim, hidden_size, num_domains, device),
        }
    }

    /// Sigmoid keep-probabilities of both descriptor branches: [B, L, 2]
    pub fn token_scores(&self, combined: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch, len, branches, _] = combined.dims();
        let h = activation::tanh(self.score_hidden.forward(combined));
        activation::sigmoid(self.score_output.forward(h)).reshape([batch, len, branches])
    }

    /// Samples fresh Gumbel noise on every call, validation included.
    pub fn forward<E: ContextEncoder<B>>(&self, encoder: &E, input: ExtractorInput<B>) -> ExtractorOutput<B> {
        let [batch, len, branches, _] = input.combined.dims();
        let noise = sample_gumbel::<B>([batch, len, branches], &input.combined.device());
        self.forward_with_noise(encoder, input, noise)
    }

    /// Same as `forward` with fixed Gumbel noise of shape [B, L, 2].
    pub fn forward_with_noise<E: ContextEncoder<B>>(
        &self,
        encoder: &E,
        input:   ExtractorInput<B>,
        noise:   Tensor<B, 3>,
    ) -> ExtractorOutput<B> {
        let ExtractorInput { combined, hidden, embeddings, mask, mask_embedding } = input;
        let [batch, len, dim] = hidden.dims();

        // ── Step 1: gate ──────────────────────────────────────────────────────
        let scores = self.token_scores(combined);
        let gated = self.gate.forward_with_noise(scores, noise);
        let p0 = DescriptorBranch::Own.select(gated);

        // ── Step 2: structural positions ──────────────────────────────────────
        let structural = structural_mask(mask.clone());
        let z = structural.clone().unsqueeze_dim::<3>(2);

        // ── Step 3: replace gated tokens by [MASK] ────────────────────────────
        let e_mask = mask_embedding.reshape([1, 1, dim]).expand([batch, len, dim]);
        let replaced = embeddings.clone() * complement(p0.clone()) + e_mask * p0.clone();
        let masked_embeddings = replaced * complement(z.clone()) + embeddings * z;

        // ── Step 4: re-encode, shared representation at [CLS] ────────────────
        let layers = encoder.encode(masked_embeddings.clone(), mask.clone());
        let shared_sequence = sum_last_layers(&layers, SUMMED_LAYERS);
        let shared = shared_sequence.clone().slice([0..batch, 0..1, 0..dim]).reshape([batch, dim]);

        // ── Step 5: adversarial shared domain classifier ──────────────────────
        let shared_logits = self.shared_dc.forward(self.reversal.forward(shared));

        // ── Step 6: private summary ───────────────────────────────────────────
        let eligible = (mask.clone() * complement(structural.clone())).unsqueeze_dim::<3>(2);
        let keep = p0.clone() * eligible.clone();
        let kept = keep.clone().sum_dim(1).reshape([batch, 1]);
        let summary = guarded_mean(hidden.clone() * keep.clone(), kept.clone());
        let private_logits = self.private_dc.forward(summary.clone());

        // ── Step 7: attention of every token to the summary ───────────────────
        let attn_scores = activation::sigmoid(
            hidden.clone() * eligible.clone() * summary.unsqueeze_dim::<3>(1),
        );
        let attention = masked_softmax(attn_scores, mask, structural);
        let private_sequence = hidden * attention * keep;

        // ── Step 8: share of eligible tokens that were masked ─────────────────
        let eligible_count = eligible.sum_dim(1).reshape([batch, 1]);
        let empty = eligible_count.clone().equal_elem(0.0).float();
        let mask_percentage = (kept / (eligible_count + empty)).reshape([batch]);

        ExtractorOutput {
            shared_logits,
            shared_sequence,
            private_logits,
            private_sequence,
            mask_percentage,
            masked_embeddings,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::descriptors::DomainDescriptors;
    use crate::ml::encoder::{TransformerEncoder, TransformerEncoderConfig};
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TB = NdArray;

    const D: usize = 8;
    const W: usize = 4;
    const L: usize = 6;

    struct Fixture {
        encoder:    TransformerEncoder<TB>,
        extractor:  SharedPrivateExtractor<TB>,
        input:      ExtractorInput<TB>,
    }

    fn fixture() -> Fixture {
        let device = Default::default();
        let encoder = TransformerEncoderConfig::new(12, L, D, 2, 2, 16)
            .with_dropout(0.0)
            .init::<TB>(&device);
        let extractor = SharedPrivateExtractor::new(D, W, 5, 3, 0.5, 0.1, 1.0, &device);
        let descriptors = DomainDescriptors::<TB>::new(3, W, &device);

        let ids = Tensor::<TB, 2, Int>::from_ints([[9, 3, 4, 5, 10, 0], [9, 6, 10, 0, 0, 0]], &device);
        let mask = Tensor::<TB, 2>::from_floats(
            [[1.0, 1.0, 1.0, 1.0, 1.0, 0.0], [1.0, 1.0, 1.0, 0.0, 0.0, 0.0]],
            &device,
        );
        let domains = Tensor::<TB, 1, Int>::from_ints([0, 2], &device);

        let embeddings = encoder.embed_tokens(ids);
        let hidden = sum_last_layers(&encoder.encode(embeddings.clone(), mask.clone()), SUMMED_LAYERS);
        let combined = descriptors.combine(hidden.clone(), domains, mask.clone());

        let input = ExtractorInput {
            combined,
            hidden,
            embeddings,
            mask,
            mask_embedding: encoder.token_embedding(11),
        };
        Fixture { encoder, extractor, input }
    }

    fn values<const N: usize>(t: Tensor<TB, N>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_output_shapes() {
        let f = fixture();
        let out = f.extractor.forward(&f.encoder, f.input);
        assert_eq!(out.shared_logits.dims(), [2, 3]);
        assert_eq!(out.private_logits.dims(), [2, 3]);
        assert_eq!(out.shared_sequence.dims(), [2, L, D]);
        assert_eq!(out.private_sequence.dims(), [2, L, D]);
        assert_eq!(out.mask_percentage.dims(), [2]);
        assert_eq!(out.masked_embeddings.dims(), [2, L, D]);
    }

    #[test]
    fn test_structural_positions_keep_their_embeddings() {
        let f = fixture();
        let original = values(f.input.embeddings.clone());
        // large positive noise on the Own branch masks every other token
        let noise = Tensor::<TB, 3>::from_floats([[[50.0, -50.0]; L]; 2], &Default::default());
        let out = f.extractor.forward_with_noise(&f.encoder, f.input, noise);
        let masked = values(out.masked_embeddings);

        // row 0: [CLS] at 0 and [SEP] at 4; row 1: [CLS] at 0 and [SEP] at 2
        for (row, pos) in [(0, 0), (0, 4), (1, 0), (1, 2)] {
            let at = (row * L + pos) * D;
            assert_eq!(&masked[at..at + D], &original[at..at + D], "row {row} position {pos}");
        }

        // a gated inner token (row 0, position 1) carries the [MASK] embedding
        let e_mask = values(f.encoder.token_embedding(11));
        let at = D;
        for (m, e) in masked[at..at + D].iter().zip(e_mask.iter()) {
            assert!((m - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_nothing_gated_gives_zero_private_summary_and_percentage() {
        let f = fixture();
        let noise = Tensor::<TB, 3>::from_floats([[[-50.0, 50.0]; L]; 2], &Default::default());
        let out = f.extractor.forward_with_noise(&f.encoder, f.input.clone(), noise);

        assert_eq!(values(out.mask_percentage), vec![0.0, 0.0]);
        assert!(values(out.private_sequence).iter().all(|v| *v == 0.0));
        // zero summary through zero-bias Linear, tanh, Linear
        assert!(values(out.private_logits).iter().all(|v| *v == 0.0));
        // masked embeddings equal the inputs when nothing is gated
        assert_eq!(values(out.masked_embeddings), values(f.input.embeddings));
    }

    #[test]
    fn test_everything_gated_gives_full_percentage() {
        let f = fixture();
        let noise = Tensor::<TB, 3>::from_floats([[[50.0, -50.0]; L]; 2], &Default::default());
        let out = f.extractor.forward_with_noise(&f.encoder, f.input, noise);
        for p in values(out.mask_percentage) {
            assert!((p - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mask_percentage_in_unit_interval() {
        let f = fixture();
        for _ in 0..5 {
            let noise = Tensor::<TB, 3>::random([2, L, 2], Distribution::Normal(0.0, 2.0), &Default::default());
            let out = f.extractor.forward_with_noise(&f.encoder, f.input.clone(), noise);
            for p in values(out.mask_percentage) {
                assert!((0.0..=1.0).contains(&p), "mask percentage {p}");
            }
        }
    }
}
