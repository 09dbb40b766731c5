// ============================================================
// Layer 5 — Tensor Operations
// ============================================================
// Small building blocks shared by the masker components:
//
//   structural_mask   — flags [CLS] (position 0) and [SEP]
//                       (position sum(mask) - 1) per example
//   masked_softmax    — exp-normalisation that gives padding and
//                       structural positions exactly zero weight
//   straight_through  — hard value forward, soft gradient backward
//   reverse_gradient  — identity forward, -alpha gradient backward
//   uniform_linear    — Linear with U(-0.1, 0.1) weights, zero bias
//
// The last two are built from detach(): `x - x.detach()` is
// exactly zero in the forward pass but carries x's gradient.

use burn::{
    module::Param,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
};

/// Added to the normaliser of `masked_softmax`.
pub const SOFTMAX_EPS: f64 = 1e-9;

/// Bound of the uniform weight initialisation for masker layers.
pub const INIT_RANGE: f64 = 0.1;

/// Linear layer with weights drawn from U(-0.1, 0.1) and a zero bias.
pub fn uniform_linear<B: Backend>(d_input: usize, d_output: usize, device: &B::Device) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(Initializer::Uniform { min: -INIT_RANGE, max: INIT_RANGE })
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    linear
}

/// `1 - x`
pub fn complement<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.neg().add_scalar(1.0)
}

/// Float position indices `0..len` broadcast to `[batch, len]`.
pub fn positions<B: Backend>(batch: usize, len: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1, Int>::arange(0..len as i64, device)
        .float()
        .unsqueeze::<2>()
        .expand([batch, len])
}

/// `[batch, len]` with 1.0 at the start marker and at the separator.
///
/// `mask` must mark at least two real tokens per row.
pub fn structural_mask<B: Backend>(mask: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, len] = mask.dims();
    let pos = positions::<B>(batch, len, &mask.device());

    let last = mask.sum_dim(1).sub_scalar(1.0).expand([batch, len]);
    let is_last  = pos.clone().equal(last).float();
    let is_first = pos.equal_elem(0.0).float();

    (is_first + is_last).clamp_max(1.0)
}

/// `exp(S) * M * (1 - Z) / (sum_L(exp(S) * M * (1 - Z)) + 1e-9)`
///
/// scores:     [batch, len, dim]
/// mask:       [batch, len]  real tokens
/// structural: [batch, len]  start / separator tokens
pub fn masked_softmax<B: Backend>(
    scores:     Tensor<B, 3>,
    mask:       Tensor<B, 2>,
    structural: Tensor<B, 2>,
) -> Tensor<B, 3> {
    let keep = (mask * complement(structural)).unsqueeze_dim::<3>(2);
    let weights = scores.exp() * keep;
    let total = weights.clone().sum_dim(1).add_scalar(SOFTMAX_EPS);
    weights / total
}

/// Forward value of `hard`, gradient of `soft`.
pub fn straight_through<B: Backend, const D: usize>(
    soft: Tensor<B, D>,
    hard: Tensor<B, D>,
) -> Tensor<B, D> {
    hard.detach() + (soft.clone() - soft.detach())
}

/// Identity forward; the backward pass multiplies the gradient by `-alpha`.
pub fn reverse_gradient<B: Backend, const D: usize>(x: Tensor<B, D>, alpha: f64) -> Tensor<B, D> {
    let frozen = x.clone().detach();
    frozen.clone() + (x - frozen).mul_scalar(-alpha)
}

/// Gradient reversal layer used in front of the shared domain classifier.
#[derive(Module, Clone, Debug)]
pub struct GradientReversal {
    alpha: f64,
}

impl GradientReversal {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        reverse_gradient(x, self.alpha)
    }
}

/// Sum over `len` divided by the per-row denominator; rows whose
/// denominator is zero divide by one instead.
pub fn guarded_mean<B: Backend>(weighted: Tensor<B, 3>, denominator: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, _, dim] = weighted.dims();
    let empty = denominator.clone().equal_elem(0.0).float();
    let safe = (denominator + empty).expand([batch, dim]);
    weighted.sum_dim(1).reshape([batch, dim]) / safe
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TB = NdArray;
    type AD = Autodiff<NdArray>;

    fn values<const D: usize>(t: Tensor<TB, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    fn mask_rows() -> Tensor<TB, 2> {
        // row 0: 5 real tokens, row 1: 3 real tokens
        Tensor::from_floats(
            [[1.0, 1.0, 1.0, 1.0, 1.0, 0.0], [1.0, 1.0, 1.0, 0.0, 0.0, 0.0]],
            &Default::default(),
        )
    }

    #[test]
    fn test_structural_mask_flags_first_and_last_real_token() {
        let z = values(structural_mask(mask_rows()));
        assert_eq!(z, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_masked_softmax_normalises_real_non_structural_positions() {
        let device = Default::default();
        let mask = mask_rows();
        let z = structural_mask(mask.clone());
        let scores = Tensor::<TB, 3>::from_floats(
            [
                [[0.3, -1.0], [1.2, 0.4], [-0.7, 2.0], [0.1, 0.1], [5.0, 5.0], [9.0, 9.0]],
                [[2.0, 2.0], [0.5, -0.5], [3.0, 3.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]],
            ],
            &device,
        );

        let a = masked_softmax(scores, mask, z);
        let v = values(a.clone());

        // structural and padding positions carry exactly zero weight
        for (pos, keep) in [(0, false), (1, true), (2, true), (3, true), (4, false), (5, false)] {
            for d in 0..2 {
                let w = v[pos * 2 + d];
                if keep { assert!(w > 0.0) } else { assert_eq!(w, 0.0) }
            }
        }

        // sums over the sequence are 1 for every feature of every row
        let totals = values(a.sum_dim(1));
        for t in totals {
            assert!((t - 1.0).abs() < 1e-5, "total was {t}");
        }
    }

    #[test]
    fn test_masked_softmax_all_excluded_is_zero_not_nan() {
        let device = Default::default();
        // two real tokens only: both structural
        let mask = Tensor::<TB, 2>::from_floats([[1.0, 1.0, 0.0]], &device);
        let z = structural_mask(mask.clone());
        let a = masked_softmax(Tensor::<TB, 3>::ones([1, 3, 2], &device), mask, z);
        assert!(values(a).iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_straight_through_forward_and_gradient() {
        let device = Default::default();
        let soft = Tensor::<AD, 1>::from_floats([0.2, 0.7, 0.45], &device).require_grad();
        let hard = soft.clone().round();

        let out = straight_through(soft.clone(), hard);
        let weights = Tensor::<AD, 1>::from_floats([1.0, 2.0, 3.0], &device);
        let grads = (out.clone() * weights).sum().backward();

        assert_eq!(out.into_data().to_vec::<f32>().unwrap(), vec![0.0, 1.0, 0.0]);
        let g = soft.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
        assert_eq!(g, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_gradient_reversal_is_identity_forward_negated_backward() {
        let device = Default::default();
        let x = Tensor::<AD, 1>::from_floats([0.5, -1.5], &device).require_grad();
        let grl = GradientReversal::new(0.3);

        let y = grl.forward(x.clone());
        assert_eq!(y.clone().into_data().to_vec::<f32>().unwrap(), vec![0.5, -1.5]);

        let grads = y.mul_scalar(2.0).sum().backward();
        let g = x.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();
        for v in g {
            assert!((v + 0.6).abs() < 1e-6);
        }
    }

    #[test]
    fn test_uniform_linear_init() {
        let linear = uniform_linear::<TB>(6, 4, &Default::default());
        let w = values(linear.weight.val());
        assert_eq!(w.len(), 24);
        assert!(w.iter().all(|v| v.abs() <= INIT_RANGE as f32));
        let b = linear.bias.map(|b| values(b.val())).unwrap_or_default();
        assert_eq!(b, vec![0.0; 4]);
    }

    #[test]
    fn test_guarded_mean_zero_denominator_gives_zero() {
        let device = Default::default();
        let weighted = Tensor::<TB, 3>::zeros([2, 3, 2], &device);
        let denominator = Tensor::<TB, 2>::from_floats([[0.0], [2.0]], &device);
        let out = values(guarded_mean(weighted, denominator));
        assert!(out.iter().all(|v| *v == 0.0 && !v.is_nan()));
    }
}
