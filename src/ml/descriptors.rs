// ============================================================
// Layer 5 — Domain Descriptor Store
// ============================================================
// One learned descriptor vector per domain. Every token is
// paired with two descriptors at once:
//
//   DescriptorBranch::Own   its own domain's descriptor
//   DescriptorBranch::Mean  the mean over all domains
//
// The pairs are stacked on a size-2 "branch" axis so the mask
// FFN scores both views in a single pass:
//
//   hidden [B, L, D] ──┬─ cat(own)  ─┐
//                      └─ cat(mean) ─┴─ stack → [B, L, 2, D + W]
//
// The mean row is recomputed every call, never stored.

use burn::{
    module::Param,
    prelude::*,
    tensor::Distribution,
};

use crate::ml::ops::INIT_RANGE;

/// Position on the size-2 branch axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorBranch {
    Own,
    Mean,
}

impl DescriptorBranch {
    pub fn index(self) -> usize {
        match self {
            DescriptorBranch::Own => 0,
            DescriptorBranch::Mean => 1,
        }
    }

    /// Select this branch from a `[B, L, 2]` tensor, keeping a trailing axis.
    pub fn select<B: Backend>(self, branches: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, len, _] = branches.dims();
        let i = self.index();
        branches.slice([0..batch, 0..len, i..i + 1])
    }
}

#[derive(Module, Debug)]
pub struct DomainDescriptors<B: Backend> {
    /// The descriptor table: [num_domains, W]
    pub rows: Param<Tensor<B, 2>>,
}

impl<B: Backend> DomainDescriptors<B> {
    pub fn new(num_domains: usize, width: usize, device: &B::Device) -> Self {
        let rows = Tensor::<B, 2>::random(
            [num_domains, width],
            Distribution::Uniform(-INIT_RANGE, INIT_RANGE),
            device,
        );
        Self { rows: Param::from_tensor(rows) }
    }

    pub fn width(&self) -> usize {
        self.rows.dims()[1]
    }

    /// Each example's own descriptor repeated over `len`: `[B, len, W]`.
    pub fn lookup(&self, domains: Tensor<B, 1, Int>, len: usize) -> Tensor<B, 3> {
        let batch = domains.dims()[0];
        self.rows
            .val()
            .select(0, domains)
            .unsqueeze_dim::<3>(1)
            .expand([batch, len, self.width()])
    }

    /// Mean descriptor repeated over `[batch, len]`: `[B, len, W]`.
    pub fn mean(&self, batch: usize, len: usize) -> Tensor<B, 3> {
        self.rows
            .val()
            .mean_dim(0)
            .unsqueeze::<3>()
            .expand([batch, len, self.width()])
    }

    /// Token representations paired with both descriptors, zeroed at padding.
    ///
    /// hidden: [B, L, D], mask: [B, L] → [B, L, 2, D + W]
    pub fn combine(
        &self,
        hidden:  Tensor<B, 3>,
        domains: Tensor<B, 1, Int>,
        mask:    Tensor<B, 2>,
    ) -> Tensor<B, 4> {
        let [batch, len, _] = hidden.dims();
        let keep = mask.unsqueeze_dim::<3>(2);

        let own  = Tensor::cat(vec![hidden.clone(), self.lookup(domains, len)], 2) * keep.clone();
        let mean = Tensor::cat(vec![hidden, self.mean(batch, len)], 2) * keep;

        let mut branches = vec![(DescriptorBranch::Own, own), (DescriptorBranch::Mean, mean)];
        branches.sort_by_key(|(branch, _)| branch.index());
        Tensor::stack::<4>(branches.into_iter().map(|(_, t)| t).collect(), 2)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn store() -> DomainDescriptors<TB> {
        let device = Default::default();
        let rows = Tensor::<TB, 2>::from_floats([[1.0, 2.0], [3.0, 4.0], [5.0, 9.0]], &device);
        DomainDescriptors { rows: Param::from_tensor(rows) }
    }

    #[test]
    fn test_init_is_within_range() {
        let d = DomainDescriptors::<TB>::new(3, 16, &Default::default());
        let v = d.rows.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(v.len(), 48);
        assert!(v.iter().all(|x| (-0.1..=0.1).contains(x)));
    }

    #[test]
    fn test_lookup_and_mean() {
        let d = store();
        let device = Default::default();
        let domains = Tensor::<TB, 1, Int>::from_ints([2, 0], &device);

        let own = d.lookup(domains, 3);
        assert_eq!(own.dims(), [2, 3, 2]);
        let v = own.into_data().to_vec::<f32>().unwrap();
        assert_eq!(&v[..2], &[5.0, 9.0]);
        assert_eq!(&v[6..8], &[1.0, 2.0]);

        let mean = d.mean(2, 3).into_data().to_vec::<f32>().unwrap();
        assert_eq!(&mean[..2], &[3.0, 5.0]);
        assert_eq!(&mean[10..12], &[3.0, 5.0]);
    }

    #[test]
    fn test_combine_shape_branches_and_padding() {
        let d = store();
        let device = Default::default();
        let hidden = Tensor::<TB, 3>::ones([1, 3, 4], &device);
        let domains = Tensor::<TB, 1, Int>::from_ints([1], &device);
        let mask = Tensor::<TB, 2>::from_floats([[1.0, 1.0, 0.0]], &device);

        let z = d.combine(hidden, domains, mask);
        assert_eq!(z.dims(), [1, 3, 2, 6]);

        let v = z.into_data().to_vec::<f32>().unwrap();
        // position 0, own branch: hidden then domain 1's descriptor
        assert_eq!(&v[0..6], &[1.0, 1.0, 1.0, 1.0, 3.0, 4.0]);
        // position 0, mean branch
        assert_eq!(&v[6..12], &[1.0, 1.0, 1.0, 1.0, 3.0, 5.0]);
        // padding position is zero on both branches
        assert!(v[24..36].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_branch_select() {
        let device = Default::default();
        let p = Tensor::<TB, 3>::from_floats([[[0.0, 1.0], [1.0, 0.0]]], &device);
        let own = DescriptorBranch::Own.select(p.clone());
        assert_eq!(own.dims(), [1, 2, 1]);
        assert_eq!(own.into_data().to_vec::<f32>().unwrap(), vec![0.0, 1.0]);
        let mean = DescriptorBranch::Mean.select(p);
        assert_eq!(mean.into_data().to_vec::<f32>().unwrap(), vec![1.0, 0.0]);
    }
}
