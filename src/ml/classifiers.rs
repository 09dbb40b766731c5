// ============================================================
// Layer 5 — Classifier Heads
// ============================================================
//   DomainClassifier     Linear → tanh → Linear, raw domain logits.
//                        One instance reads the gradient-reversed
//                        shared representation, a second one reads
//                        the private summary.
//
//   SentimentClassifier  [shared LCR ; private LCR] → Linear,
//                        raw polarity logits.

use burn::{
    nn::Linear,
    prelude::*,
    tensor::activation,
};

use crate::ml::ops::uniform_linear;

#[derive(Module, Debug)]
pub struct DomainClassifier<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> DomainClassifier<B> {
    pub fn new(d_input: usize, d_hidden: usize, num_domains: usize, device: &B::Device) -> Self {
        Self {
            hidden: uniform_linear(d_input, d_hidden, device),
            output: uniform_linear(d_hidden, num_domains, device),
        }
    }

    /// [batch, d_input] → [batch, num_domains]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(activation::tanh(self.hidden.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct SentimentClassifier<B: Backend> {
    output: Linear<B>,
}

impl<B: Backend> SentimentClassifier<B> {
    /// `d_branch` is the width of one LCR output.
    pub fn new(d_branch: usize, num_polarities: usize, device: &B::Device) -> Self {
        Self { output: uniform_linear(2 * d_branch, num_polarities, device) }
    }

    /// shared, private: [batch, d_branch] → [batch, num_polarities]
    pub fn forward(&self, shared: Tensor<B, 2>, private: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(Tensor::cat(vec![shared, private], 1))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    #[test]
    fn test_domain_classifier_shape() {
        let device = Default::default();
        let dc = DomainClassifier::<TB>::new(8, 5, 3, &device);
        let logits = dc.forward(Tensor::ones([4, 8], &device));
        assert_eq!(logits.dims(), [4, 3]);
    }

    #[test]
    fn test_zero_input_gives_zero_logits() {
        // zero bias on both layers and tanh(0) = 0
        let device = Default::default();
        let dc = DomainClassifier::<TB>::new(6, 4, 2, &device);
        let v = dc.forward(Tensor::zeros([2, 6], &device)).into_data().to_vec::<f32>().unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_sentiment_classifier_concatenates_branches() {
        let device = Default::default();
        let sc = SentimentClassifier::<TB>::new(16, 3, &device);
        let logits = sc.forward(Tensor::ones([2, 16], &device), Tensor::zeros([2, 16], &device));
        assert_eq!(logits.dims(), [2, 3]);
    }
}
