// ============================================================
// Layer 5 — Relaxed Binary Gate
// ============================================================
// Turns per-token, per-branch keep probabilities [B, L, 2]
// into a near-binary decision with a usable gradient.
//
//   g   = -log(-log(U + eps) + eps)            U ~ Uniform(0, 1)
//   p   = softmax((log(probs) + g) / tau)      over the branch axis
//   Ps  = p - masking
//   Ph  = round(Ps)                            0 or 1
//   out = Ph  forward, dOut/dPs = 1  backward  (straight-through)
//
// `probs` must be strictly positive (the caller feeds sigmoid
// outputs). Small tau gives sharp, high-variance samples; large
// tau gives smooth but indecisive ones. `masking` shifts the
// rounding boundary from 0.5 up to 0.5 + masking.
//
// Reference: Jang et al. (2017) Categorical Reparameterization
//            with Gumbel-Softmax

use burn::{
    prelude::*,
    tensor::{activation, Distribution},
};

use crate::ml::ops::straight_through;

/// Keeps `log` finite at U = 0 and U = 1.
const GUMBEL_EPS: f64 = 1e-20;

/// Gumbel(0, 1) noise of the given shape.
pub fn sample_gumbel<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 3> {
    let uniform = Tensor::<B, 3>::random(shape, Distribution::Uniform(0.0, 1.0), device);
    uniform
        .add_scalar(GUMBEL_EPS)
        .log()
        .neg()
        .add_scalar(GUMBEL_EPS)
        .log()
        .neg()
}

#[derive(Module, Clone, Debug)]
pub struct RelaxedBinaryGate {
    temperature: f64,
    masking: f64,
}

impl RelaxedBinaryGate {
    pub fn new(temperature: f64, masking: f64) -> Self {
        assert!(temperature > 0.0, "temperature must be positive, got {temperature}");
        Self { temperature, masking }
    }

    /// Concrete-distribution sample: `softmax((log(probs) + noise) / tau)`.
    pub fn relax<B: Backend>(&self, probs: Tensor<B, 3>, noise: Tensor<B, 3>) -> Tensor<B, 3> {
        activation::softmax((probs.log() + noise).div_scalar(self.temperature), 2)
    }

    /// Gate decision for the given Gumbel noise: 1 keeps the token, 0 masks it.
    pub fn forward_with_noise<B: Backend>(&self, probs: Tensor<B, 3>, noise: Tensor<B, 3>) -> Tensor<B, 3> {
        let soft = self.relax(probs, noise).sub_scalar(self.masking);
        let hard = soft.clone().round();
        straight_through(soft, hard)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TB = NdArray;
    type AD = Autodiff<NdArray>;

    const PROBS: [[[f32; 2]; 3]; 1] = [[[0.3, 0.7], [0.9, 0.2], [0.55, 0.6]]];
    const NOISE: [[[f32; 2]; 3]; 1] = [[[0.1, -0.2], [0.05, 0.4], [-0.3, 0.25]]];
    const WEIGHTS: [[[f32; 2]; 3]; 1] = [[[1.0, 2.0], [3.0, -1.0], [0.5, 1.5]]];
    const TAU: f64 = 0.5;

    #[test]
    fn test_forward_values_are_binary() {
        let device = Default::default();
        let gate = RelaxedBinaryGate::new(TAU, 0.1);
        let probs = Tensor::<TB, 3>::random([4, 7, 2], Distribution::Uniform(0.05, 0.95), &device);

        for _ in 0..5 {
            let noise = sample_gumbel::<TB>([4, 7, 2], &device);
            let out = gate.forward_with_noise(probs.clone(), noise).into_data().to_vec::<f32>().unwrap();
            assert!(out.iter().all(|&v| v == 0.0 || v == 1.0), "{out:?}");
        }
    }

    #[test]
    fn test_masking_offset_moves_the_boundary() {
        let device = Default::default();
        // equal probabilities and no noise → p = 0.5 on both branches
        let probs = Tensor::<TB, 3>::full([1, 1, 2], 0.5, &device);
        let noise = Tensor::<TB, 3>::zeros([1, 1, 2], &device);

        let biased = RelaxedBinaryGate::new(1.0, 0.1).forward_with_noise(probs.clone(), noise.clone());
        assert_eq!(biased.into_data().to_vec::<f32>().unwrap(), vec![0.0, 0.0]);

        let unbiased = RelaxedBinaryGate::new(1.0, -0.1).forward_with_noise(probs, noise);
        assert_eq!(unbiased.into_data().to_vec::<f32>().unwrap(), vec![1.0, 1.0]);
    }

    /// d/dp_i of sum_j w_j * softmax_j((log p + g) / tau), derived by hand.
    fn relaxed_gradient(p: [f32; 2], g: [f32; 2], w: [f32; 2], tau: f64) -> [f64; 2] {
        let x: Vec<f64> = (0..2).map(|i| ((p[i] as f64).ln() + g[i] as f64) / tau).collect();
        let m = x[0].max(x[1]);
        let e: Vec<f64> = x.iter().map(|v| (v - m).exp()).collect();
        let s: Vec<f64> = e.iter().map(|v| v / (e[0] + e[1])).collect();

        let mut grad = [0.0; 2];
        for (i, gi) in grad.iter_mut().enumerate() {
            let mut acc = 0.0;
            for j in 0..2 {
                let delta = if i == j { 1.0 } else { 0.0 };
                acc += w[j] as f64 * s[j] * (delta - s[i]);
            }
            *gi = acc / (tau * p[i] as f64);
        }
        grad
    }

    #[test]
    fn test_gradient_is_that_of_the_relaxed_value() {
        let device = Default::default();
        let gate = RelaxedBinaryGate::new(TAU, 0.1);

        let probs = Tensor::<AD, 3>::from_floats(PROBS, &device).require_grad();
        let noise = Tensor::<AD, 3>::from_floats(NOISE, &device);
        let weights = Tensor::<AD, 3>::from_floats(WEIGHTS, &device);

        let out = gate.forward_with_noise(probs.clone(), noise);
        let grads = (out * weights).sum().backward();
        let got = probs.grad(&grads).unwrap().into_data().to_vec::<f32>().unwrap();

        for (pos, chunk) in got.chunks(2).enumerate() {
            let want = relaxed_gradient(PROBS[0][pos], NOISE[0][pos], WEIGHTS[0][pos], TAU);
            for k in 0..2 {
                assert!(
                    (chunk[k] as f64 - want[k]).abs() < 1e-4,
                    "position {pos} branch {k}: got {} want {}",
                    chunk[k],
                    want[k]
                );
            }
        }
    }

    #[test]
    fn test_hand_gradient_matches_finite_difference() {
        // Guards the reference derivative used above.
        let (p, g, w) = (PROBS[0][0], NOISE[0][0], WEIGHTS[0][0]);
        let f = |p: [f32; 2]| -> f64 {
            let x: Vec<f64> = (0..2).map(|i| ((p[i] as f64).ln() + g[i] as f64) / TAU).collect();
            let z = x[0].exp() + x[1].exp();
            w[0] as f64 * x[0].exp() / z + w[1] as f64 * x[1].exp() / z
        };
        let analytic = relaxed_gradient(p, g, w, TAU);
        let h = 1e-3f32;
        for k in 0..2 {
            let (mut up, mut down) = (p, p);
            up[k] += h;
            down[k] -= h;
            let numeric = (f(up) - f(down)) / (2.0 * h as f64);
            assert!((numeric - analytic[k]).abs() < 1e-2, "branch {k}: {numeric} vs {}", analytic[k]);
        }
    }

    #[test]
    fn test_gumbel_noise_is_finite() {
        let noise = sample_gumbel::<TB>([3, 5, 2], &Default::default());
        assert!(noise.into_data().to_vec::<f32>().unwrap().iter().all(|v| v.is_finite()));
    }
}
