// ============================================================
// Layer 2 — Baseline Use Cases
// ============================================================
// The baselines need no checkpoint: each run rebuilds the
// vocabulary and corpus from train.tsv in memory, fits the
// baseline and answers one query.

use anyhow::{bail, Result};
use std::path::Path;

use crate::application::generate_use_case::render;
use crate::baselines::{lookup::LookupModel, retrieval::RetrievalModel};
use crate::data::{dataset::Seq2SeqCorpus, loader::TsvPairLoader, vocab::Vocab};
use crate::domain::traits::{PairSource, SequenceSampler};

/// Vocabulary and training corpus from `{data_dir}/train.tsv`.
fn load_corpus(data_dir: &str, max_vocab: usize) -> Result<(Vocab, Seq2SeqCorpus)> {
    let pairs = TsvPairLoader::new(Path::new(data_dir).join("train.tsv")).load_pairs()?;
    if pairs.is_empty() {
        bail!("No training pairs found in '{}/train.tsv'", data_dir);
    }
    let texts: Vec<&str> = pairs.iter().flat_map(|p| p.texts()).collect();
    let vocab  = Vocab::from_texts(&texts, max_vocab)?;
    let corpus = Seq2SeqCorpus::from_pairs(&vocab, &pairs, &[])?;
    Ok((vocab, corpus))
}

/// The query template and what the retrieval model proposed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub template:  String,
    pub neighbors: Vec<String>,
}

// ─── RetrieveUseCase ──────────────────────────────────────────────────────────
pub struct RetrieveUseCase {
    vocab: Vocab,
    model: RetrievalModel,
}

impl RetrieveUseCase {
    pub fn new(data_dir: &str, max_span: usize, max_vocab: usize) -> Result<Self> {
        let (vocab, corpus) = load_corpus(data_dir, max_vocab)?;
        let model = RetrievalModel::prepare(corpus.enumerate_comp_train(max_span, vocab.hole()));
        if model.template_count() == 0 {
            bail!("No templates could be built from '{}/train.tsv'", data_dir);
        }
        Ok(Self { vocab, model })
    }

    /// Retrieve for `template` (text with `[HOLE]`), or for a template
    /// drawn by weight when none is given.
    pub fn retrieve(&self, template: Option<&str>) -> Result<Retrieved> {
        let ids = match template {
            Some(text) => self.vocab.encode(text)?,
            None => match self.model.sample_template(&mut rand::thread_rng()) {
                Some(ids) => ids.clone(),
                None      => bail!("The retrieval model has no templates"),
            },
        };

        let samples   = self.model.sample(&ids)?;
        let neighbors = render(&self.vocab, &samples, true)?
            .into_iter()
            .map(|(text, _)| text)
            .collect();

        Ok(Retrieved { template: self.vocab.decode_template(&ids)?, neighbors })
    }
}

// ─── LookupUseCase ────────────────────────────────────────────────────────────
pub struct LookupUseCase {
    vocab: Vocab,
    model: LookupModel,
}

impl LookupUseCase {
    pub fn new(data_dir: &str, draws: usize, max_vocab: usize) -> Result<Self> {
        let (vocab, corpus) = load_corpus(data_dir, max_vocab)?;
        let model = LookupModel::train(&corpus, draws, &mut rand::thread_rng());
        Ok(Self { vocab, model })
    }

    /// Every sequence recorded opposite `context`, sorted, plus the
    /// training frequency of each context token.
    pub fn lookup(&self, context: &str) -> Result<(Vec<String>, Vec<(String, usize)>)> {
        let ids = self.vocab.encode(context)?;

        let mut matches = self
            .model
            .generalize(&ids)
            .iter()
            .map(|seq| self.vocab.decode(seq))
            .collect::<Result<Vec<_>>>()?;
        matches.sort();

        let counts = ids
            .iter()
            .map(|&id| Ok((self.vocab.decode_template(&[id])?, self.model.token_count(id))))
            .collect::<Result<Vec<_>>>()?;

        Ok((matches, counts))
    }
}
