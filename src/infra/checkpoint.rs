// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores generator weights using Burn's
// CompactRecorder (MessagePack + gzip).
//
// Layout of a checkpoint directory:
//
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← number of the last saved epoch
//     best_epoch.json        ← epoch with the lowest validation loss
//     train_config.json      ← hyperparameters to rebuild the model
//     tokenizer.json         ← see tokenizer_store.rs
//     metrics.csv            ← see metrics.rs
//
// Inference prefers best_epoch.json and falls back to
// latest_epoch.json when no best epoch was recorded.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::GeneratorModel;

const LATEST_FILE: &str = "latest_epoch.json";
const BEST_FILE:   &str = "best_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Write `{dir}/model_epoch_{epoch}.mpk.gz` and move the latest pointer.
    pub fn save_model<B: Backend>(&self, model: &GeneratorModel<B>, epoch: usize) -> Result<()> {
        // The recorder appends the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_pointer(LATEST_FILE, epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Record `epoch` as the best one seen so far.
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_pointer(BEST_FILE, epoch)?;
        tracing::debug!("Best epoch is now {}", epoch);
        Ok(())
    }

    /// Load the best recorded epoch, or the latest one.
    ///
    /// `model` must have the saved architecture or loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:  GeneratorModel<B>,
        device: &B::Device,
    ) -> Result<GeneratorModel<B>> {
        let epoch = self.preferred_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Must run before training so inference can rebuild the architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'generate'.",
                path.display()
            )
        })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Best epoch when recorded, else the latest.
    pub fn preferred_epoch(&self) -> Result<usize> {
        match self.read_pointer(BEST_FILE)? {
            Some(epoch) => Ok(epoch),
            None => self
                .read_pointer(LATEST_FILE)?
                .context("Cannot find 'latest_epoch.json'. Have you run 'train' first?"),
        }
    }

    fn write_pointer(&self, file: &str, epoch: usize) -> Result<()> {
        let path = self.dir.join(file);
        fs::write(&path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))
    }

    fn read_pointer(&self, file: &str) -> Result<Option<usize>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str::<usize>(&s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::GeneratorConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_best_epoch_wins_over_latest() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.preferred_epoch().is_err());

        ckpt.write_pointer(LATEST_FILE, 3).unwrap();
        assert_eq!(ckpt.preferred_epoch().unwrap(), 3);

        ckpt.mark_best(2).unwrap();
        assert_eq!(ckpt.preferred_epoch().unwrap(), 2);
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig { n_enc: 16, copy: true, ..TrainConfig::default() };

        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.n_enc, 16);
        assert!(loaded.copy);
    }

    #[test]
    fn test_saved_weights_reload() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = GeneratorConfig::new(9, 0).with_n_emb(4).with_n_enc(6);

        let saved: GeneratorModel<TestBackend> = config.init(&device);
        ckpt.save_model(&saved, 1).unwrap();

        let fresh: GeneratorModel<TestBackend> = config.init(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let weights = |m: &GeneratorModel<TestBackend>| -> Vec<f32> {
            m.proj.weight.val().into_data().convert::<f32>().to_vec().unwrap()
        };
        // CompactRecorder stores half precision
        let (loaded, saved) = (weights(&loaded), weights(&saved));
        assert_eq!(loaded.len(), saved.len());
        for (l, s) in loaded.iter().zip(&saved) {
            assert!((l - s).abs() < 1e-3, "{l} vs {s}");
        }
    }
}
