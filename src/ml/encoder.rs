// ============================================================
// Layer 5 — Context Encoder
// ============================================================
// The masker never looks inside the encoder. It needs exactly
// three things from it, captured by `ContextEncoder`:
//
//   embed_tokens     ids → input embeddings E
//   token_embedding  one row of the embedding table ([MASK], [PAD])
//   encode           E (possibly masked) → every hidden layer
//
// `encode` returns the embedding-layer output first, then one
// tensor per encoder block, BERT style. Downstream code sums the
// last four of them.
//
// TransformerEncoder is a post-norm transformer encoder:
//
//   E + position ─► LayerNorm ─► dropout ─► block × N
//   block: x ─► self-attention(pad mask) ─► +x ─► norm1
//            ─► Linear ─► GELU ─► Linear ─► +x ─► norm2
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

/// Number of trailing layers summed into a token representation.
pub const SUMMED_LAYERS: usize = 4;

pub trait ContextEncoder<B: Backend> {
    /// ids: [batch, len] → [batch, len, hidden_dim]
    fn embed_tokens(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3>;

    /// Embedding-table row for a single token id: [hidden_dim]
    fn token_embedding(&self, id: usize) -> Tensor<B, 1>;

    /// embeddings: [batch, len, hidden_dim], mask: [batch, len] (1.0 = real)
    fn encode(&self, embeddings: Tensor<B, 3>, mask: Tensor<B, 2>) -> Vec<Tensor<B, 3>>;
}

/// Sum of the last `n` layers, or of every layer when fewer exist.
///
/// `layers` always holds at least the embedding output.
pub fn sum_last_layers<B: Backend>(layers: &[Tensor<B, 3>], n: usize) -> Tensor<B, 3> {
    let skip = layers.len().saturating_sub(n.max(1));
    let mut sum = layers[skip].clone();
    for layer in &layers[skip + 1..] {
        sum = sum + layer.clone();
    }
    sum
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerEncoderConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl TransformerEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let embedding_norm = LayerNormConfig::new(self.d_model).init(device);
        let dropout        = DropoutConfig::new(self.dropout).init();
        TransformerEncoder {
            token_embedding, position_embedding, layers,
            embedding_norm, dropout,
            d_model: self.d_model,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, len, d_model], pad: [batch, len] true at padding
    pub fn forward(&self, x: Tensor<B, 3>, pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input = MhaInput::self_attn(x.clone()).mask_pad(pad);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub embedding_norm:     LayerNorm<B>,
    pub dropout:            Dropout,
    pub d_model:            usize,
}

impl<B: Backend> ContextEncoder<B> for TransformerEncoder<B> {
    fn embed_tokens(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.token_embedding.forward(ids)
    }

    fn token_embedding(&self, id: usize) -> Tensor<B, 1> {
        self.token_embedding
            .weight
            .val()
            .slice([id..id + 1, 0..self.d_model])
            .reshape([self.d_model])
    }

    fn encode(&self, embeddings: Tensor<B, 3>, mask: Tensor<B, 2>) -> Vec<Tensor<B, 3>> {
        let [batch_size, seq_len, _] = embeddings.dims();

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &embeddings.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let pad = mask.equal_elem(0.0);
        let mut x = self.dropout.forward(self.embedding_norm.forward(embeddings + pos_emb));

        let mut outputs = Vec::with_capacity(self.layers.len() + 1);
        outputs.push(x.clone());
        for layer in &self.layers {
            x = layer.forward(x, pad.clone());
            outputs.push(x.clone());
        }
        outputs
    }
}
