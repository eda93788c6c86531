// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads the vocabulary and the preferred checkpoint once, then
// turns input strings into decoded output strings with scores.

use anyhow::Result;

use crate::data::vocab::Vocab;
use crate::domain::{
    generation::{DecodeMode, Samples},
    traits::SequenceSampler,
};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::inferencer::Inferencer;

pub struct GenerateUseCase {
    vocab:   Vocab,
    sampler: Box<dyn SequenceSampler>,
}

impl GenerateUseCase {
    pub fn new(checkpoint_dir: &str, mode: DecodeMode, max_len: usize) -> Result<Self> {
        let vocab        = TokenizerStore::new(checkpoint_dir).load()?;
        let ckpt_manager = CheckpointManager::new(checkpoint_dir)?;
        let inferencer   = Inferencer::from_checkpoint(&ckpt_manager, &vocab, mode, max_len)?;
        Ok(Self { vocab, sampler: Box::new(inferencer) })
    }

    /// Decoded outputs for `input`, in the sampler's order.
    pub fn generate(&self, input: &str) -> Result<Vec<(String, f32)>> {
        let ids     = self.vocab.encode_wrapped(input)?;
        let samples = self.sampler.sample(&ids)?;
        tracing::debug!("Input '{}' produced {} sequences", input, samples.len());
        render(&self.vocab, &samples, false)
    }
}

/// Decode every sequence in `samples`. Templates keep their `[HOLE]`.
pub fn render(vocab: &Vocab, samples: &Samples, templates: bool) -> Result<Vec<(String, f32)>> {
    samples
        .iter()
        .map(|(ids, score)| {
            let text = if templates { vocab.decode_template(ids)? } else { vocab.decode(ids)? };
            Ok((text, score))
        })
        .collect()
}
