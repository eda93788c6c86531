// ============================================================
// Layer 5 — Lookup Model
// ============================================================
// Draws random training pairs, counts every token it sees and
// remembers which sequences appeared together, in both
// directions. `generalize` is an exact-match table lookup.

use rand::Rng;
use std::collections::{HashMap, HashSet};

use crate::data::dataset::Seq2SeqCorpus;

/// Training draws used when none are configured.
pub const DEFAULT_DRAWS: usize = 10_000;

#[derive(Debug, Default)]
pub struct LookupModel {
    counter: HashMap<u32, usize>,
    data:    HashMap<Vec<u32>, HashSet<Vec<u32>>>,
}

impl LookupModel {
    pub fn train<R: Rng + ?Sized>(corpus: &Seq2SeqCorpus, draws: usize, rng: &mut R) -> Self {
        let mut model = Self::default();

        for _ in 0..draws {
            let Some(pair) = corpus.sample_train(rng) else {
                tracing::warn!("Lookup model trained on an empty corpus");
                break;
            };
            for &tok in pair.input.iter().chain(&pair.output) {
                *model.counter.entry(tok).or_default() += 1;
            }
            model.data.entry(pair.input.clone()).or_default().insert(pair.output.clone());
            model.data.entry(pair.output.clone()).or_default().insert(pair.input.clone());
        }

        tracing::info!(
            "Lookup model: {} distinct sequences, {} distinct tokens",
            model.data.len(),
            model.counter.len()
        );
        model
    }

    /// Every sequence seen opposite `ctx`; empty when `ctx` was never drawn.
    pub fn generalize(&self, ctx: &[u32]) -> HashSet<Vec<u32>> {
        self.data.get(ctx).cloned().unwrap_or_default()
    }

    pub fn token_count(&self, token: u32) -> usize {
        self.counter.get(&token).copied().unwrap_or(0)
    }
}
