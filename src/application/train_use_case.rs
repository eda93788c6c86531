// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Load train.tsv / val.tsv    (Layer 4 - data)
//   Step 2: Split off validation pairs  (Layer 4 - data)
//   Step 3: Build / load vocabulary     (Layer 6 - infra)
//   Step 4: Tokenise the corpus         (Layer 4 - data)
//   Step 5: Save config                 (Layer 6 - infra)
//   Step 6: Run training loop           (Layer 5 - ml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::{Seq2SeqCorpus, Seq2SeqDataset},
    loader::TsvPairLoader,
    splitter::split_train_val,
};
use crate::domain::{pair::SequencePair, traits::PairSource};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every hyperparameter of a run. Saved as train_config.json so
// the inferencer can rebuild the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub checkpoint_dir: String,
    pub n_emb:          usize,
    pub n_enc:          usize,
    pub dropout:        f64,
    pub copy:           bool,
    pub self_attention: bool,
    /// Supervise the direct and copy heads separately
    pub copy_sup:       bool,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    /// Held-out share of train.tsv when there is no val.tsv
    pub val_fraction:   f64,
    pub max_vocab:      usize,
    pub seed:           u64,
    /// Filled in from the built vocabulary, specials included
    #[serde(default)]
    pub vocab_size:     usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            n_emb:          64,
            n_enc:          512,
            dropout:        0.0,
            copy:           false,
            self_attention: false,
            copy_sup:       false,
            batch_size:     32,
            epochs:         10,
            lr:             1e-3,
            val_fraction:   0.1,
            max_vocab:      10_000,
            seed:           42,
            vocab_size:     0,
        }
    }
}

/// Training and validation pairs from `data_dir`.
///
/// Uses val.tsv when present; otherwise holds out `val_fraction` of
/// train.tsv, shuffled with `seed`.
pub fn load_split(
    data_dir:     &str,
    val_fraction: f64,
    seed:         u64,
) -> Result<(Vec<SequencePair>, Vec<SequencePair>)> {
    let dir   = Path::new(data_dir);
    let train = TsvPairLoader::new(dir.join("train.tsv")).load_pairs()?;

    let val_loader = TsvPairLoader::new(dir.join("val.tsv"));
    if val_loader.exists() {
        return Ok((train, val_loader.load_pairs()?));
    }

    tracing::info!("No val.tsv, holding out {:.0}% of train.tsv", val_fraction * 100.0);
    Ok(split_train_val(train, 1.0 - val_fraction, seed))
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let mut cfg = self.config.clone();

        // ── Steps 1-2: Load pairs and split ───────────────────────────────────
        tracing::info!("Loading pairs from '{}'", cfg.data_dir);
        let (train_pairs, val_pairs) = load_split(&cfg.data_dir, cfg.val_fraction, cfg.seed)?;
        if train_pairs.is_empty() {
            bail!("No training pairs found in '{}/train.tsv'", cfg.data_dir);
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_pairs.len(),
            val_pairs.len()
        );

        // ── Step 3: Build / load vocabulary ───────────────────────────────────
        // Validation words are included so they don't all decode as [UNK]
        let texts: Vec<&str> = train_pairs
            .iter()
            .chain(&val_pairs)
            .flat_map(|p| p.texts())
            .collect();
        let vocab = TokenizerStore::new(&cfg.checkpoint_dir).load_or_build(&texts, cfg.max_vocab)?;
        cfg.vocab_size = vocab.len();

        // ── Step 4: Tokenise ──────────────────────────────────────────────────
        let corpus        = Seq2SeqCorpus::from_pairs(&vocab, &train_pairs, &val_pairs)?;
        let train_dataset = Seq2SeqDataset::new(corpus.train_samples(&vocab));
        let val_dataset   = Seq2SeqDataset::new(corpus.val_samples(&vocab));

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(&cfg)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training(&cfg, vocab.pad(), train_dataset, val_dataset, ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_uses_val_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.tsv"), "a\tb\nc\td\n").unwrap();
        fs::write(dir.path().join("val.tsv"), "e\tf\n").unwrap();

        let (train, val) = load_split(dir.path().to_str().unwrap(), 0.5, 0).unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(val, vec![SequencePair::new("e", "f")]);
    }

    #[test]
    fn test_splits_train_without_val_file() {
        let dir   = tempfile::tempdir().unwrap();
        let lines = (0..10).map(|i| format!("in {i}\tout {i}\n")).collect::<String>();
        fs::write(dir.path().join("train.tsv"), lines).unwrap();

        let (train, val) = load_split(dir.path().to_str().unwrap(), 0.2, 7).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
    }

    #[test]
    fn test_config_without_vocab_size_deserialises() {
        let mut json = serde_json::to_value(TrainConfig::default()).unwrap();
        json.as_object_mut().unwrap().remove("vocab_size");
        let cfg: TrainConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.vocab_size, 0);
        assert_eq!(cfg.n_enc, 512);
    }
}
