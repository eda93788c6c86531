// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources and samplers
// only through these traits:
//   - TsvPairLoader implements PairSource
//   - RetrievalModel and the neural Inferencer both
//     implement SequenceSampler, so `generate` and
//     `retrieve` share the same printing path.

use anyhow::Result;

use crate::domain::generation::Samples;
use crate::domain::pair::SequencePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can provide supervised text pairs.
pub trait PairSource {
    /// Load all available pairs from this source.
    fn load_pairs(&self) -> Result<Vec<SequencePair>>;
}

// ─── SequenceSampler ──────────────────────────────────────────────────────────
/// Anything that proposes output token sequences for one input.
///
/// An empty `Samples` means the sampler has nothing to offer for
/// this input; it is not an error.
pub trait SequenceSampler {
    fn sample(&self, input: &[u32]) -> Result<Samples>;
}
