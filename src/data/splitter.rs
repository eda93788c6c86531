// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Used when the data directory has no val.tsv: the training
// pairs are shuffled and a fraction is held out for validation.
//
// The shuffle is seeded from the training config so a rerun
// with the same seed holds out the same pairs, which keeps
// metrics.csv comparable across runs.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// `train_fraction` is clamped to [0, 1]; the train side gets
/// `round(len * train_fraction)` items.
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
