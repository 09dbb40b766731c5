// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles the samples of each domain separately and splits
// every domain by the same fraction, so both sets contain
// every domain in roughly the original proportions. A domain
// with fewer samples than the corpus average would otherwise
// risk disappearing from the validation set.
//
// The RNG is seeded so a run can be repeated exactly.

use std::collections::BTreeMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle and split `samples` into (train, validation), stratified by
/// the domain returned from `domain_of`.
pub fn split_by_domain<T, F>(
    samples:        Vec<T>,
    train_fraction: f64,
    seed:           u64,
    domain_of:      F,
) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> usize,
{
    let mut rng = StdRng::seed_from_u64(seed);

    // BTreeMap keeps domain order stable between runs
    let mut per_domain: BTreeMap<usize, Vec<T>> = BTreeMap::new();
    for s in samples {
        per_domain.entry(domain_of(&s)).or_default().push(s);
    }

    let mut train = Vec::new();
    let mut val   = Vec::new();

    for (domain, mut group) in per_domain {
        group.shuffle(&mut rng);

        let total    = group.len();
        let split_at = (((total as f64) * train_fraction).round() as usize).min(total);
        let tail     = group.split_off(split_at);

        tracing::debug!(
            "Domain {}: {} training, {} validation",
            domain,
            group.len(),
            tail.len(),
        );

        train.extend(group);
        val.extend(tail);
    }

    // Interleave domains inside each set
    train.shuffle(&mut rng);
    val.shuffle(&mut rng);

    (train, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(n: usize, domain: usize) -> Vec<(usize, usize)> {
        (0..n).map(|i| (domain, i)).collect()
    }

    #[test]
    fn test_every_domain_is_split() {
        let mut items = tagged(100, 0);
        items.extend(tagged(10, 1));

        let (train, val) = split_by_domain(items, 0.8, 7, |s| s.0);
        assert_eq!(train.len(), 88);
        assert_eq!(val.len(), 22);
        assert_eq!(val.iter().filter(|s| s.0 == 1).count(), 2);
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_by_domain(tagged(30, 0), 0.5, 42, |s| s.0);
        let b = split_by_domain(tagged(30, 0), 0.5, 42, |s| s.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_by_domain(Vec::<(usize, usize)>::new(), 0.8, 1, |s| s.0);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let (train, val) = split_by_domain(tagged(10, 3), 1.0, 1, |s| s.0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }
}
