// ============================================================
// Layer 3 — SequencePair Domain Type
// ============================================================
// One supervised example for the sequence-to-sequence task:
// an input sentence and the output sentence it should map to.
// Both sides are whitespace-tokenised text; ids are assigned
// later by the vocabulary.
//
// Example (SCAN-style command → action):
//   input:  "jump twice"
//   output: "JUMP JUMP"

use serde::{Deserialize, Serialize};

/// A raw text pair, after normalisation but before tokenisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePair {
    /// Source side, fed to the encoder
    pub input: String,

    /// Target side, produced by the decoder
    pub output: String,
}

impl SequencePair {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input:  input.into(),
            output: output.into(),
        }
    }

    /// Both sides, for vocabulary building.
    pub fn texts(&self) -> [&str; 2] {
        [self.input.as_str(), self.output.as_str()]
    }
}
