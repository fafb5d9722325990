// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into a training set (used
// to update weights) and a validation set (used to measure
// generalisation on unseen trees).
//
// Shuffling first matters: generated datasets are written in
// generation order, and without a shuffle the validation set
// would be a biased tail slice. Fisher-Yates via
// rand::seq::SliceRandom is the standard unbiased shuffle.
//
// When a seed is given the split is reproducible — the same
// seed always lands the same samples in each set.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `samples` and split into (train, validation).
/// `train_fraction` is the training proportion, e.g. 0.8.
/// The split index is clamped, so tiny datasets never panic —
/// they just end up with an empty validation set.
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           Option<u64>,
) -> (Vec<T>, Vec<T>) {
    match seed {
        Some(seed) => samples.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => samples.shuffle(&mut rand::thread_rng()),
    }

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) removes [n..] and returns it.
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.8, None);
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(),   20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.7, None);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.8, None);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val)      = split_train_val(items, 1.0, None);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }

    #[test]
    fn test_seed_makes_split_reproducible() {
        let (train_a, val_a) = split_train_val((0..30).collect::<Vec<_>>(), 0.8, Some(9));
        let (train_b, val_b) = split_train_val((0..30).collect::<Vec<_>>(), 0.8, Some(9));
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }
}
