// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Persists the vocabulary as a HuggingFace tokenizer.json in
// the checkpoint directory. Training builds it once from the
// corpus; later runs (and inference) reload the same file so
// token ids never shift under a trained model.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::data::vocab::Vocab;

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load an existing vocabulary or build and save one from `texts`.
    pub fn load_or_build<S: AsRef<str>>(&self, texts: &[S], max_size: usize) -> Result<Vocab> {
        if self.dir.join(TOKENIZER_FILE).exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new vocabulary (max_size={})", max_size);
            self.build_and_save(texts, max_size)
        }
    }

    pub fn load(&self) -> Result<Vocab> {
        let path = self.dir.join(TOKENIZER_FILE);
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}. Have you run 'train' first?",
                path.display(),
                e
            )
        })?;
        Ok(Vocab::from_tokenizer(tokenizer))
    }

    fn build_and_save<S: AsRef<str>>(&self, texts: &[S], max_size: usize) -> Result<Vocab> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let json  = Vocab::build_json(texts, max_size);
        let vocab = Vocab::from_json(&json)?;

        let path = self.dir.join(TOKENIZER_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!("Vocabulary of {} ids saved to '{}'", vocab.len(), path.display());
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_then_reload_keeps_ids() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());

        let built = store.load_or_build(&["walk twice", "walk walk"], 50).unwrap();
        // Different texts on the second call are ignored: the saved file wins
        let again = store.load_or_build(&["completely different words"], 50).unwrap();

        assert_eq!(built.len(), again.len());
        assert_eq!(built.encode("walk twice").unwrap(), again.encode("walk twice").unwrap());
    }

    #[test]
    fn test_load_without_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TokenizerStore::new(dir.path()).load().is_err());
    }
}
