// ============================================================
// Layer 4 — Pair Loader
// ============================================================
// Loads supervised pairs from a tab-separated file:
//
//   jump twice<TAB>I_JUMP I_JUMP
//   walk left<TAB>I_TURN_LEFT I_WALK
//
// Bad lines (no tab, or an empty side after cleaning) are
// logged and skipped rather than failing the whole run.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::pair::SequencePair;
use crate::domain::traits::PairSource;

/// Reads one `input<TAB>output` file.
pub struct TsvPairLoader {
    path: PathBuf,
}

impl TsvPairLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

impl PairSource for TsvPairLoader {
    fn load_pairs(&self) -> Result<Vec<SequencePair>> {
        // A missing file is an empty corpus, not an error
        if !self.path.exists() {
            tracing::warn!(
                "Data file '{}' does not exist, returning no pairs",
                self.path.display()
            );
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read '{}'", self.path.display()))?;

        let pairs = parse_pairs(&text, &self.path.display().to_string());
        tracing::info!("Loaded {} pairs from '{}'", pairs.len(), self.path.display());
        Ok(pairs)
    }
}

/// Parse file contents into pairs. `origin` is only used for log lines.
fn parse_pairs(text: &str, origin: &str) -> Vec<SequencePair> {
    let prep      = Preprocessor::new();
    let mut pairs = Vec::new();

    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let Some((input, output)) = line.split_once('\t') else {
            tracing::warn!("{}:{}: no tab separator, skipping", origin, n + 1);
            continue;
        };

        let input  = prep.clean(input);
        let output = prep.clean(output);
        if input.is_empty() || output.is_empty() {
            tracing::warn!("{}:{}: empty side, skipping", origin, n + 1);
            continue;
        }

        pairs.push(SequencePair::new(input, output));
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parses_and_skips_bad_lines() {
        let text = "jump\tJUMP\nno separator here\n\nwalk twice\tWALK WALK\n \tEMPTY\n";
        let pairs = parse_pairs(text, "test");
        assert_eq!(
            pairs,
            vec![
                SequencePair::new("jump", "JUMP"),
                SequencePair::new("walk twice", "WALK WALK"),
            ]
        );
    }

    #[test]
    fn test_only_first_tab_splits() {
        let pairs = parse_pairs("a b\tc\td\n", "test");
        assert_eq!(pairs[0].output, "c d");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir    = tempfile::tempdir().unwrap();
        let loader = TsvPairLoader::new(dir.path().join("nope.tsv"));
        assert!(!loader.exists());
        assert!(loader.load_pairs().unwrap().is_empty());
    }

    #[test]
    fn test_loads_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.tsv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "look  left\tLOOK   LTURN").unwrap();
        let pairs = TsvPairLoader::new(&path).load_pairs().unwrap();
        assert_eq!(pairs, vec![SequencePair::new("look left", "LOOK LTURN")]);
    }
}
