// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the generator from train_config.json, loads the
// preferred checkpoint and decodes token-id inputs in one of
// three modes:
//
//   Greedy          → one argmax sequence
//   Sample { n }    → n independent draws, decoded as one batch
//   Beam { k }      → up to k hypotheses, best first

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::vocab::Vocab;
use crate::domain::{
    generation::{DecodeMode, Samples},
    traits::SequenceSampler,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::decoding::DecodeTokens;
use crate::ml::model::GeneratorModel;
use crate::ml::trainer::generator_config;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend = InferBackend> {
    model:   GeneratorModel<B>,
    tokens:  DecodeTokens,
    mode:    DecodeMode,
    max_len: usize,
    device:  B::Device,
}

impl Inferencer<InferBackend> {
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        vocab:        &Vocab,
        mode:         DecodeMode,
        max_len:      usize,
    ) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        Self::load(ckpt_manager, vocab, mode, max_len, device)
    }
}

impl<B: Backend> Inferencer<B> {
    pub fn new(
        model:   GeneratorModel<B>,
        vocab:   &Vocab,
        mode:    DecodeMode,
        max_len: usize,
        device:  B::Device,
    ) -> Self {
        let tokens = DecodeTokens { sos: vocab.sos(), eos: vocab.eos() };
        Self { model, tokens, mode, max_len, device }
    }

    /// Rebuild the architecture from train_config.json and load weights.
    pub fn load(
        ckpt_manager: &CheckpointManager,
        vocab:        &Vocab,
        mode:         DecodeMode,
        max_len:      usize,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        if cfg.vocab_size != vocab.len() {
            bail!(
                "Checkpoint expects {} vocabulary ids but tokenizer.json has {}",
                cfg.vocab_size,
                vocab.len()
            );
        }

        // Dropout is irrelevant at inference time
        let model_cfg = generator_config(&cfg, vocab.pad()).with_dropout(0.0);
        let model: GeneratorModel<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint, decoding with {:?}", mode);

        Ok(Self::new(model, vocab, mode, max_len, device))
    }

    /// `rows` copies of `input` as a [rows, len] tensor.
    fn input_tensor(&self, input: &[u32], rows: usize) -> Tensor<B, 2, Int> {
        let ints: Vec<i32> = std::iter::repeat(input)
            .take(rows)
            .flatten()
            .map(|&t| t as i32)
            .collect();
        Tensor::<B, 1, Int>::from_ints(ints.as_slice(), &self.device).reshape([rows, input.len()])
    }

    /// Decode one wrapped input (`[SOS] .. [EOS]` ids).
    pub fn decode(&self, input: &[u32]) -> Result<Samples> {
        if input.is_empty() {
            bail!("Cannot decode an empty input sequence");
        }
        let mut rng = rand::thread_rng();

        match self.mode {
            DecodeMode::Greedy => {
                self.model.sample(self.input_tensor(input, 1), self.tokens, self.max_len, true, &mut rng)
            }
            DecodeMode::Sample { count: 0 } => Ok(Samples::empty()),
            DecodeMode::Sample { count } => {
                self.model.sample(self.input_tensor(input, count), self.tokens, self.max_len, false, &mut rng)
            }
            DecodeMode::Beam { beam_size } => {
                self.model.beam(self.input_tensor(input, 1), self.tokens, beam_size, self.max_len)
            }
        }
    }
}

impl<B: Backend> SequenceSampler for Inferencer<B> {
    fn sample(&self, input: &[u32]) -> Result<Samples> {
        self.decode(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::tokenizer_store::TokenizerStore;
    use crate::ml::model::GeneratorConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inferencer(mode: DecodeMode) -> (Inferencer<TestBackend>, Vocab) {
        let vocab  = Vocab::from_texts(&["jump twice", "run left"], 100).unwrap();
        let device = Default::default();
        let model  = GeneratorConfig::new(vocab.len(), 0)
            .with_n_emb(4)
            .with_n_enc(6)
            .with_copy(true)
            .init::<TestBackend>(&device);
        (Inferencer::new(model, &vocab, mode, 6, device), vocab)
    }

    #[test]
    fn test_greedy_returns_one_sequence() {
        let (inf, vocab) = inferencer(DecodeMode::Greedy);
        let input = vocab.encode_wrapped("jump twice").unwrap();
        let out   = inf.sample(&input).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.sequences[0].len() <= 6);
    }

    #[test]
    fn test_sampling_returns_requested_count() {
        let (inf, vocab) = inferencer(DecodeMode::Sample { count: 4 });
        let out = inf.sample(&vocab.encode_wrapped("run left").unwrap()).unwrap();
        assert_eq!(out.len(), 4);

        let (none, _) = inferencer(DecodeMode::Sample { count: 0 });
        assert!(none.sample(&vocab.encode_wrapped("run").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_beam_returns_at_most_beam_size() {
        let (inf, vocab) = inferencer(DecodeMode::Beam { beam_size: 3 });
        let out = inf.sample(&vocab.encode_wrapped("jump left").unwrap()).unwrap();
        assert!(!out.is_empty() && out.len() <= 3);
    }

    #[test]
    fn test_decodes_from_saved_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();

        let vocab = TokenizerStore::new(dir.path())
            .load_or_build(&["jump twice", "run left"], 100)
            .unwrap();
        let cfg = TrainConfig {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            n_emb:          4,
            n_enc:          6,
            copy:           true,
            self_attention: true,
            vocab_size:     vocab.len(),
            ..TrainConfig::default()
        };
        let ckpt  = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&cfg).unwrap();
        let model = generator_config(&cfg, vocab.pad()).init::<TestBackend>(&device);
        ckpt.save_model(&model, 1).unwrap();
        ckpt.mark_best(1).unwrap();

        // Everything below reads only what was written to disk
        let vocab = TokenizerStore::new(dir.path()).load().unwrap();
        let input = vocab.encode_wrapped("jump left").unwrap();

        let greedy = Inferencer::<TestBackend>::load(&ckpt, &vocab, DecodeMode::Greedy, 5, device)
            .unwrap()
            .sample(&input)
            .unwrap();
        assert_eq!(greedy.len(), 1);
        assert!(greedy.sequences[0].len() <= 5);

        let beam = Inferencer::<TestBackend>::load(&ckpt, &vocab, DecodeMode::Beam { beam_size: 2 }, 5, Default::default())
            .unwrap()
            .sample(&input)
            .unwrap();
        assert!(!beam.is_empty() && beam.len() <= 2);
    }

    #[test]
    fn test_load_rejects_mismatched_vocabulary() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&TrainConfig { vocab_size: 3, ..TrainConfig::default() }).unwrap();

        let vocab = Vocab::from_texts(&["jump twice"], 100).unwrap();
        let res   = Inferencer::<TestBackend>::load(&ckpt, &vocab, DecodeMode::Greedy, 5, Default::default());
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let (inf, _) = inferencer(DecodeMode::Greedy);
        assert!(inf.sample(&[]).is_err());
    }
}
