// ============================================================
// Layer 5 — BERTMasker-plus Model
// ============================================================
// Wires the components together:
//
//   H, domains ─► DomainDescriptors::combine ─► [B, L, 2, D + W]
//                                                   │
//   E, [MASK] ────────────────────────────► SharedPrivateExtractor
//                                            │              │
//                              shared sequence         private sequence
//                                    │                       │
//                             split_contexts           split_contexts
//                                    │                       │
//                               LcrRotHop               LcrRotHop
//                                    └──────── cat ──────────┘
//                                               │
//                                     SentimentClassifier
//
// MaskerPipeline adds the encoder in front: it embeds the ids,
// encodes them, sums the last four layers into H and looks up the
// [MASK] and [PAD] rows before calling the masker.
//
// Reference: Yuan et al. (2022) Domain-Adaptive Aspect-Based
//            Sentiment Classification with Domain-Specific
//            Masking (BERTMasker)

use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};

use crate::data::batcher::AspectBatch;
use crate::data::dataset::SpecialTokens;
use crate::ml::classifiers::SentimentClassifier;
use crate::ml::contexts::split_contexts;
use crate::ml::descriptors::DomainDescriptors;
use crate::ml::encoder::{
    sum_last_layers, ContextEncoder, TransformerEncoder, TransformerEncoderConfig, SUMMED_LAYERS,
};
use crate::ml::extractor::{ExtractorInput, SharedPrivateExtractor};
use crate::ml::lcr::LcrRotHop;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct MaskerConfig {
    /// Encoder hidden width D
    pub hidden_dim:     usize,
    pub num_domains:    usize,
    /// Width of the token-scoring FFN and the domain classifiers
    #[config(default = 128)]
    pub hidden_size:    usize,
    /// Descriptor width W
    #[config(default = 100)]
    pub descriptor_dim: usize,
    #[config(default = 0.5)]
    pub temperature:    f64,
    /// Gradient reversal strength
    #[config(default = 1.0)]
    pub alpha:          f64,
    /// Offset subtracted from the relaxed gate before rounding
    #[config(default = 0.1)]
    pub masking:        f64,
    #[config(default = 3)]
    pub num_polarities: usize,
    #[config(default = 64)]
    pub hidden_lstm:    usize,
    #[config(default = 3)]
    pub hops:           usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
}

impl MaskerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertMaskerPlus<B> {
        let descriptors = DomainDescriptors::new(self.num_domains, self.descriptor_dim, device);
        let extractor = SharedPrivateExtractor::new(
            self.hidden_dim,
            self.descriptor_dim,
            self.hidden_size,
            self.num_domains,
            self.temperature,
            self.masking,
            self.alpha,
            device,
        );
        let shared_lcr  = LcrRotHop::new(self.hidden_dim, self.hidden_lstm, self.hops, self.dropout, device);
        let private_lcr = LcrRotHop::new(self.hidden_dim, self.hidden_lstm, self.hops, self.dropout, device);
        let sentiment   = SentimentClassifier::new(shared_lcr.output_dim(), self.num_polarities, device);
        BertMaskerPlus { descriptors, extractor, shared_lcr, private_lcr, sentiment }
    }
}

/// Everything the masker needs for one batch.
#[derive(Debug, Clone)]
pub struct MaskerInput<B: Backend> {
    /// Summed encoder layers H: [B, L, D]
    pub hidden:         Tensor<B, 3>,
    /// Input embeddings E: [B, L, D]
    pub embeddings:     Tensor<B, 3>,
    /// [B, L], 1.0 at real tokens
    pub mask:           Tensor<B, 2>,
    pub domains:        Tensor<B, 1, Int>,
    /// [B, 2] aspect start and exclusive end in encoder positions
    pub target_spans:   Tensor<B, 2, Int>,
    pub mask_embedding: Tensor<B, 1>,
    pub pad_embedding:  Tensor<B, 1>,
}

#[derive(Debug, Clone)]
pub struct MaskerOutput<B: Backend> {
    pub shared_domain_logits:  Tensor<B, 2>,
    pub private_domain_logits: Tensor<B, 2>,
    pub sentiment_logits:      Tensor<B, 2>,
    pub mask_percentage:       Tensor<B, 1>,
    /// Encoder input after masking, exported for inspection
    #[allow(dead_code)]
    pub masked_embeddings:     Tensor<B, 3>,
}

#[derive(Module, Debug)]
pub struct BertMaskerPlus<B: Backend> {
    pub descriptors: DomainDescriptors<B>,
    pub extractor:   SharedPrivateExtractor<B>,
    pub shared_lcr:  LcrRotHop<B>,
    pub private_lcr: LcrRotHop<B>,
    pub sentiment:   SentimentClassifier<B>,
}

impl<B: Backend> BertMaskerPlus<B> {
    pub fn forward<E: ContextEncoder<B>>(&self, encoder: &E, input: MaskerInput<B>) -> MaskerOutput<B> {
        let MaskerInput {
            hidden, embeddings, mask, domains, target_spans, mask_embedding, pad_embedding,
        } = input;

        // ── (1) Descriptor concatenation ──────────────────────────────────────
        let combined = self.descriptors.combine(hidden.clone(), domains, mask.clone());

        // ── (2) Shared / private extraction ───────────────────────────────────
        let extractor_input = ExtractorInput {
            combined,
            hidden,
            embeddings,
            mask: mask.clone(),
            mask_embedding,
        };
        let extracted = self.extractor.forward(encoder, extractor_input);

        // ── (3) Context split of both sequences ───────────────────────────────
        let shared_split = split_contexts(
            extracted.shared_sequence,
            target_spans.clone(),
            pad_embedding.clone(),
            mask.clone(),
        );
        let private_split = split_contexts(extracted.private_sequence, target_spans, pad_embedding, mask);

        // ── (4) LCR-Rot-hop per branch, (5) fuse and classify ─────────────────
        let shared  = self.shared_lcr.forward(shared_split);
        let private = self.private_lcr.forward(private_split);
        let sentiment_logits = self.sentiment.forward(shared, private);

        MaskerOutput {
            shared_domain_logits:  extracted.shared_logits,
            private_domain_logits: extracted.private_logits,
            sentiment_logits,
            mask_percentage:       extracted.mask_percentage,
            masked_embeddings:     extracted.masked_embeddings,
        }
    }
}

// ─── Pipeline: encoder + masker ──────────────────────────────────────────────

/// Weights of the two adversarial terms in the training loss.
#[derive(Debug, Clone, Copy)]
pub struct LossWeights {
    pub shared:  f64,
    pub private: f64,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self { shared: 1.0, private: 1.0 }
    }
}

pub struct MaskerLoss<B: Backend> {
    pub total:     Tensor<B, 1>,
    pub sentiment: Tensor<B, 1>,
    pub shared:    Tensor<B, 1>,
    pub private:   Tensor<B, 1>,
}

#[derive(Module, Debug)]
pub struct MaskerPipeline<B: Backend> {
    pub encoder:  TransformerEncoder<B>,
    pub masker:   BertMaskerPlus<B>,
    pub pad_id:   usize,
    pub mask_id:  usize,
}

impl<B: Backend> MaskerPipeline<B> {
    pub fn new(
        encoder_cfg: &TransformerEncoderConfig,
        masker_cfg:  &MaskerConfig,
        specials:    SpecialTokens,
        device:      &B::Device,
    ) -> Self {
        Self {
            encoder: encoder_cfg.init(device),
            masker:  masker_cfg.init(device),
            pad_id:  specials.pad,
            mask_id: specials.mask,
        }
    }

    pub fn forward(&self, batch: &AspectBatch<B>) -> MaskerOutput<B> {
        let input = self.masker_input(batch);
        self.masker.forward(&self.encoder, input)
    }

    fn masker_input(&self, batch: &AspectBatch<B>) -> MaskerInput<B> {
        let mask = batch.attention_mask.clone().float();
        let embeddings = self.encoder.embed_tokens(batch.input_ids.clone());
        let layers = self.encoder.encode(embeddings.clone(), mask.clone());

        MaskerInput {
            hidden:         sum_last_layers(&layers, SUMMED_LAYERS),
            embeddings,
            mask,
            domains:        batch.domains.clone(),
            target_spans:   batch.target_spans.clone(),
            mask_embedding: self.encoder.token_embedding(self.mask_id),
            pad_embedding:  self.encoder.token_embedding(self.pad_id),
        }
    }

    /// CE(sentiment) + λ_shared · CE(shared domain) + λ_private · CE(private domain)
    pub fn loss(&self, output: &MaskerOutput<B>, batch: &AspectBatch<B>, weights: LossWeights) -> MaskerLoss<B> {
        let ce = CrossEntropyLossConfig::new().init(&output.sentiment_logits.device());

        let sentiment = ce.forward(output.sentiment_logits.clone(), batch.labels.clone());
        let shared    = ce.forward(output.shared_domain_logits.clone(), batch.domains.clone());
        let private   = ce.forward(output.private_domain_logits.clone(), batch.domains.clone());

        let total = sentiment.clone()
            + shared.clone().mul_scalar(weights.shared)
            + private.clone().mul_scalar(weights.private);

        MaskerLoss { total, sentiment, shared, private }
    }

    pub fn forward_loss(&self, batch: &AspectBatch<B>, weights: LossWeights) -> (MaskerLoss<B>, MaskerOutput<B>) {
        let output = self.forward(batch);
        let loss = self.loss(&output, batch, weights);
        (loss, output)
    }
}
