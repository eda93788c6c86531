use serde::{Deserialize, Serialize};

/// Token sequences proposed for a single input, best first where the
/// producer ranks them. `scores[i]` belongs to `sequences[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Samples {
    pub sequences: Vec<Vec<u32>>,
    pub scores:    Vec<f32>,
}

impl Samples {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(sequence: Vec<u32>, score: f32) -> Self {
        Self { sequences: vec![sequence], scores: vec![score] }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Pairs of (sequence, score).
    pub fn iter(&self) -> impl Iterator<Item = (&[u32], f32)> {
        self.sequences
            .iter()
            .map(Vec::as_slice)
            .zip(self.scores.iter().copied())
    }
}

/// How the neural generator turns step distributions into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Argmax at every step
    Greedy,
    /// Draw `count` independent samples from the model distribution
    Sample { count: usize },
    /// Keep the `beam_size` best partial hypotheses
    Beam { beam_size: usize },
}

impl Default for DecodeMode {
    fn default() -> Self {
        DecodeMode::Greedy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_pairs_sequences_with_scores() {
        let samples = Samples {
            sequences: vec![vec![5, 6], vec![7]],
            scores:    vec![-0.5, -1.5],
        };
        let pairs: Vec<_> = samples.iter().collect();
        assert_eq!(pairs, vec![(&[5u32, 6][..], -0.5), (&[7u32][..], -1.5)]);
    }

    #[test]
    fn test_empty() {
        assert!(Samples::empty().is_empty());
        assert_eq!(Samples::single(vec![1], 0.0).len(), 1);
    }
}
