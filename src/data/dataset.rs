use anyhow::Result;
use burn::data::dataset::Dataset;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::vocab::Vocab;
use crate::domain::pair::SequencePair;

/// A pair as raw token ids, no `[SOS]`/`[EOS]` markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub input:  Vec<u32>,
    pub output: Vec<u32>,
}

/// One neural training example, unpadded.
///
/// `input_ids` and `output_ids` are wrapped as `[SOS] .. [EOS]`.
/// `copy_ids` is aligned with `output_ids`: the token where it also
/// occurs in the input (and is not special), `[PAD]` elsewhere. It is
/// the target for the copy head under copy supervision; the direct head
/// is supervised with `output_ids` itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seq2SeqSample {
    pub input_ids:  Vec<u32>,
    pub output_ids: Vec<u32>,
    pub copy_ids:   Vec<u32>,
}

impl Seq2SeqSample {
    pub fn new(input_ids: Vec<u32>, output_ids: Vec<u32>, vocab: &Vocab) -> Self {
        let copy_ids = output_ids
            .iter()
            .map(|&tok| {
                if !vocab.is_special(tok) && input_ids.contains(&tok) {
                    tok
                } else {
                    vocab.pad()
                }
            })
            .collect();
        Self { input_ids, output_ids, copy_ids }
    }

    pub fn from_pair(pair: &TokenPair, vocab: &Vocab) -> Self {
        let wrap = |ids: &[u32]| {
            let mut out = Vec::with_capacity(ids.len() + 2);
            out.push(vocab.sos());
            out.extend_from_slice(ids);
            out.push(vocab.eos());
            out
        };
        Self::new(wrap(&pair.input), wrap(&pair.output), vocab)
    }
}

/// The tokenised corpus shared by the neural model and the baselines.
pub struct Seq2SeqCorpus {
    pub train: Vec<TokenPair>,
    pub val:   Vec<TokenPair>,
}

impl Seq2SeqCorpus {
    pub fn from_pairs(
        vocab: &Vocab,
        train: &[SequencePair],
        val:   &[SequencePair],
    ) -> Result<Self> {
        let encode = |pairs: &[SequencePair]| -> Result<Vec<TokenPair>> {
            pairs
                .iter()
                .map(|p| {
                    Ok(TokenPair {
                        input:  vocab.encode(&p.input)?,
                        output: vocab.encode(&p.output)?,
                    })
                })
                .collect()
        };
        Ok(Self { train: encode(train)?, val: encode(val)? })
    }

    /// A uniformly random training pair, or None for an empty corpus.
    pub fn sample_train<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&TokenPair> {
        if self.train.is_empty() {
            return None;
        }
        Some(&self.train[rng.gen_range(0..self.train.len())])
    }

    /// Decompose every training input into (template, argument) pairs.
    ///
    /// For each contiguous span of 1..=`max_span` tokens, the template is
    /// the input with that span replaced by a single `hole` token and the
    /// argument is the span itself. Inputs are visited in corpus order.
    pub fn enumerate_comp_train(&self, max_span: usize, hole: u32) -> Vec<(Vec<u32>, Vec<u32>)> {
        let mut out = Vec::new();
        for pair in &self.train {
            let tokens = &pair.input;
            for len in 1..=max_span.min(tokens.len()) {
                for start in 0..=tokens.len() - len {
                    let mut template = Vec::with_capacity(tokens.len() - len + 1);
                    template.extend_from_slice(&tokens[..start]);
                    template.push(hole);
                    template.extend_from_slice(&tokens[start + len..]);
                    out.push((template, tokens[start..start + len].to_vec()));
                }
            }
        }
        out
    }

    pub fn train_samples(&self, vocab: &Vocab) -> Vec<Seq2SeqSample> {
        self.train.iter().map(|p| Seq2SeqSample::from_pair(p, vocab)).collect()
    }

    pub fn val_samples(&self, vocab: &Vocab) -> Vec<Seq2SeqSample> {
        self.val.iter().map(|p| Seq2SeqSample::from_pair(p, vocab)).collect()
    }
}

pub struct Seq2SeqDataset {
    samples: Vec<Seq2SeqSample>,
}

impl Seq2SeqDataset {
    pub fn new(samples: Vec<Seq2SeqSample>) -> Self { Self { samples } }
}

impl Dataset<Seq2SeqSample> for Seq2SeqDataset {
    fn get(&self, index: usize) -> Option<Seq2SeqSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocab::{EOS_ID, HOLE_ID, PAD_ID, SOS_ID};
    use rand::{rngs::StdRng, SeedableRng};

    fn setup() -> (Vocab, Seq2SeqCorpus) {
        let pairs = vec![
            SequencePair::new("jump twice", "jump jump"),
            SequencePair::new("walk", "walk"),
        ];
        let texts: Vec<&str> = pairs.iter().flat_map(|p| p.texts()).collect();
        let vocab  = Vocab::from_texts(&texts, 100).unwrap();
        let corpus = Seq2SeqCorpus::from_pairs(&vocab, &pairs, &[]).unwrap();
        (vocab, corpus)
    }

    #[test]
    fn test_copy_targets_mark_tokens_seen_in_input() {
        let (vocab, corpus) = setup();
        let sample = Seq2SeqSample::from_pair(&corpus.train[0], &vocab);
        let jump   = vocab.encode("jump").unwrap()[0];
        assert_eq!(sample.output_ids, vec![SOS_ID, jump, jump, EOS_ID]);
        assert_eq!(sample.copy_ids, vec![PAD_ID, jump, jump, PAD_ID]);
        assert_eq!(sample.input_ids.len(), 4);
    }

    #[test]
    fn test_copy_target_is_pad_for_unseen_token() {
        let (vocab, _) = setup();
        let walk   = vocab.encode("walk").unwrap()[0];
        let jump   = vocab.encode("jump").unwrap()[0];
        let sample = Seq2SeqSample::new(vec![SOS_ID, walk, EOS_ID], vec![SOS_ID, jump, EOS_ID], &vocab);
        assert_eq!(sample.copy_ids, vec![PAD_ID, PAD_ID, PAD_ID]);
    }

    #[test]
    fn test_enumerate_comp_train_spans() {
        let (vocab, corpus) = setup();
        let jump  = vocab.encode("jump").unwrap()[0];
        let twice = vocab.encode("twice").unwrap()[0];
        let walk  = vocab.encode("walk").unwrap()[0];

        let pairs = corpus.enumerate_comp_train(2, HOLE_ID);
        assert_eq!(
            pairs,
            vec![
                (vec![HOLE_ID, twice], vec![jump]),
                (vec![jump, HOLE_ID], vec![twice]),
                (vec![HOLE_ID], vec![jump, twice]),
                (vec![HOLE_ID], vec![walk]),
            ]
        );
    }

    #[test]
    fn test_sample_train() {
        let (_, corpus) = setup();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pair = corpus.sample_train(&mut rng).unwrap();
            assert!(corpus.train.contains(pair));
        }
        let empty = Seq2SeqCorpus { train: Vec::new(), val: Vec::new() };
        assert!(empty.sample_train(&mut rng).is_none());
    }

    #[test]
    fn test_dataset_get() {
        let (vocab, corpus) = setup();
        let ds = Seq2SeqDataset::new(corpus.train_samples(&vocab));
        assert_eq!(ds.len(), 2);
        assert!(ds.get(1).is_some());
        assert!(ds.get(2).is_none());
    }
}
