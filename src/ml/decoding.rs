// ============================================================
// Layer 5 — Autoregressive Decoding
// ============================================================
// Greedy / sampled decoding over a whole batch, and beam search
// over a single input. Both start from [SOS], feed back their
// own predictions, and stop a row at [EOS] or after `max_len`
// steps.
//
// Distributions are pulled to the CPU once per step; token
// choice and beam bookkeeping are plain Rust.

use anyhow::{bail, Result};
use burn::{nn::LstmState, prelude::*};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use crate::domain::generation::Samples;
use crate::ml::beam::{finalize, is_done, select_candidates, BeamHypothesis};
use crate::ml::model::GeneratorModel;

/// Upper bound on generated tokens per sequence.
pub const MAX_DECODE_LEN: usize = 150;

/// Special ids the decoding loops need.
#[derive(Debug, Clone, Copy)]
pub struct DecodeTokens {
    pub sos: u32,
    pub eos: u32,
}

fn to_host<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("Cannot read decoder output: {e:?}"))
}

fn token_tensor<B: Backend>(tokens: &[u32], device: &B::Device) -> Tensor<B, 1, Int> {
    let ints: Vec<i32> = tokens.iter().map(|&t| t as i32).collect();
    Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device)
}

/// Index of the largest entry; first one wins on ties.
pub fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}

/// Draw an index from a row of log-probabilities.
fn sample_row<R: Rng + ?Sized>(row: &[f32], rng: &mut R) -> usize {
    let weights: Vec<f32> = row.iter().map(|lp| lp.exp()).collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => dist.sample(rng),
        // All-zero or non-finite row: fall back to the mode
        Err(_)   => argmax(row),
    }
}

impl<B: Backend> GeneratorModel<B> {
    /// Decode every row of `inputs` ([batch, src_len]).
    ///
    /// Returned sequences exclude `[SOS]`/`[EOS]`; each score is the sum
    /// of the chosen tokens' log-probabilities, `[EOS]` included.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        inputs:  Tensor<B, 2, Int>,
        tokens:  DecodeTokens,
        max_len: usize,
        greedy:  bool,
        rng:     &mut R,
    ) -> Result<Samples> {
        let [batch, _] = inputs.dims();
        let device     = inputs.device();
        let vocab      = self.decoder.vocab_size();
        let (memory, mut state) = self.encode(inputs);

        let mut sequences = vec![Vec::new(); batch];
        let mut scores    = vec![0.0f32; batch];
        let mut done      = vec![false; batch];
        let mut prev      = vec![tokens.sos; batch];
        let mut history   = Vec::new();

        for _ in 0..max_len {
            let step = self.decoder.step(token_tensor::<B>(&prev, &device), state, &memory, &history);
            state = step.state;
            if self.decoder.uses_self_attention() {
                history.push(step.hidden);
            }

            let log_probs = to_host(step.log_probs)?;
            for row in 0..batch {
                if done[row] {
                    continue;
                }
                let dist  = &log_probs[row * vocab..(row + 1) * vocab];
                let token = if greedy { argmax(dist) } else { sample_row(dist, rng) };
                scores[row] += dist[token];

                let token = token as u32;
                prev[row] = token;
                if token == tokens.eos {
                    done[row] = true;
                } else {
                    sequences[row].push(token);
                }
            }

            if done.iter().all(|&d| d) {
                break;
            }
        }

        tracing::debug!(
            "Decoded {} sequences, {} unfinished at max_len={}",
            batch,
            done.iter().filter(|&&d| !d).count(),
            max_len
        );
        Ok(Samples { sequences, scores })
    }

    /// Beam search for a single input ([1, src_len]).
    ///
    /// Returns up to `beam_size` hypotheses, best first. Hypotheses still
    /// live at `max_len` are returned only if none finished.
    pub fn beam(
        &self,
        inputs:    Tensor<B, 2, Int>,
        tokens:    DecodeTokens,
        beam_size: usize,
        max_len:   usize,
    ) -> Result<Samples> {
        let [batch, _] = inputs.dims();
        if batch != 1 {
            bail!("beam search decodes one input at a time, got a batch of {batch}");
        }
        if beam_size == 0 {
            bail!("beam size must be at least 1");
        }

        let device = inputs.device();
        let vocab  = self.decoder.vocab_size();
        let (memory, mut state) = self.encode(inputs);

        let mut beams: Vec<BeamHypothesis> = vec![BeamHypothesis::root()];
        let mut finished: Vec<BeamHypothesis> = Vec::new();
        let mut history: Vec<Tensor<B, 2>> = Vec::new();

        for _ in 0..max_len {
            let live   = beams.len();
            let prev: Vec<u32> = beams.iter().map(|b| b.last_token(tokens.sos)).collect();
            let step   = self.decoder.step(
                token_tensor::<B>(&prev, &device),
                state,
                &memory.repeat_rows(live),
                &history,
            );

            let log_probs = to_host(step.log_probs)?;
            let selected  = select_candidates(&beams, &log_probs, vocab, beam_size, tokens.eos);
            finished.extend(selected.finished);

            let (parents, next): (Vec<usize>, Vec<BeamHypothesis>) =
                selected.continuing.into_iter().unzip();
            beams = next;
            if is_done(&finished, &beams, beam_size) {
                break;
            }

            // Reorder recurrent state and history rows to follow their parents
            let parent_ids: Vec<u32> = parents.iter().map(|&p| p as u32).collect();
            let index = token_tensor::<B>(&parent_ids, &device);
            state = LstmState::new(
                step.state.cell.select(0, index.clone()),
                step.state.hidden.select(0, index.clone()),
            );
            if self.decoder.uses_self_attention() {
                history.push(step.hidden);
                history = history
                    .into_iter()
                    .map(|h| h.select(0, index.clone()))
                    .collect();
            }
        }

        let pool = if finished.is_empty() { beams } else { finished };
        let best = finalize(pool, beam_size);
        Ok(Samples {
            scores:    best.iter().map(|h| h.score).collect(),
            sequences: best.into_iter().map(|h| h.tokens).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::GeneratorConfig;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    type TestBackend = NdArray;

    const TOKENS: DecodeTokens = DecodeTokens { sos: 2, eos: 3 };

    fn model(self_attention: bool) -> GeneratorModel<TestBackend> {
        GeneratorConfig::new(10, 0)
            .with_n_emb(6)
            .with_n_enc(8)
            .with_copy(true)
            .with_self_attention(self_attention)
            .init(&Default::default())
    }

    fn inputs(rows: &[i32], batch: usize) -> Tensor<TestBackend, 2, Int> {
        let len = rows.len() / batch;
        Tensor::<TestBackend, 1, Int>::from_ints(rows, &Default::default()).reshape([batch, len])
    }

    #[test]
    fn test_argmax_first_max_wins() {
        assert_eq!(argmax(&[-3.0, -1.0, -1.0, -2.0]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_sample_row_follows_mass() {
        let mut rng = StdRng::seed_from_u64(3);
        let row = [f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY];
        for _ in 0..10 {
            assert_eq!(sample_row(&row, &mut rng), 1);
        }
    }

    #[test]
    fn test_greedy_sample_respects_max_len() {
        let model   = model(true);
        let mut rng = StdRng::seed_from_u64(0);
        let out = model
            .sample(inputs(&[2, 5, 6, 3, 2, 7, 3, 0], 2), TOKENS, 4, true, &mut rng)
            .unwrap();

        assert_eq!(out.len(), 2);
        for (seq, score) in out.iter() {
            assert!(seq.len() <= 4);
            assert!(!seq.contains(&TOKENS.eos));
            assert!(score <= 0.0);
        }
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let model = model(false);
        let mut rng = StdRng::seed_from_u64(0);
        let a = model.sample(inputs(&[2, 5, 3], 1), TOKENS, 6, true, &mut rng).unwrap();
        let b = model.sample(inputs(&[2, 5, 3], 1), TOKENS, 6, true, &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_beam_returns_sorted_hypotheses() {
        let model = model(true);
        let out   = model.beam(inputs(&[2, 5, 6, 3], 1), TOKENS, 3, 5).unwrap();

        assert!(!out.is_empty());
        assert!(out.len() <= 3);
        for pair in out.scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        for seq in &out.sequences {
            assert!(seq.len() <= 5);
        }
    }

    #[test]
    fn test_beam_of_one_matches_greedy_score() {
        // With a single beam every step keeps the argmax extension
        let model   = model(false);
        let mut rng = StdRng::seed_from_u64(0);
        let greedy  = model.sample(inputs(&[2, 6, 3], 1), TOKENS, 5, true, &mut rng).unwrap();
        let beam    = model.beam(inputs(&[2, 6, 3], 1), TOKENS, 1, 5).unwrap();
        assert_eq!(beam.sequences[0], greedy.sequences[0]);
    }

    #[test]
    fn test_beam_returns_live_hypotheses_when_none_finish() {
        // An end id outside the vocabulary can never be emitted
        let never_ends = DecodeTokens { sos: 2, eos: 99 };
        let model = model(true);
        let out   = model.beam(inputs(&[2, 5, 6, 3], 1), never_ends, 3, 4).unwrap();

        assert_eq!(out.len(), 3);
        for seq in &out.sequences {
            assert_eq!(seq.len(), 4);
        }
        for pair in out.scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_beam_rejects_batches() {
        let model = model(false);
        assert!(model.beam(inputs(&[2, 5, 3, 2, 6, 3], 2), TOKENS, 2, 5).is_err());
    }
}
