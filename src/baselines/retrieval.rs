// ============================================================
// Layer 5 — Retrieval Model
// ============================================================
// Given (template, argument) pairs from
// Seq2SeqCorpus::enumerate_comp_train:
//
//   templ_to_arg : template → {arguments that filled it}
//   arg_to_templ : argument → {templates it filled}
//
// Two templates are neighbours when some argument fills both.
// Sampling a template returns one of its neighbours uniformly,
// counting a neighbour once per shared argument.
//
// Ordered maps keep iteration (and therefore seeded sampling)
// reproducible across runs.

use anyhow::Result;
use rand::{
    distributions::{Distribution, WeightedIndex},
    seq::SliceRandom,
    Rng,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{generation::Samples, traits::SequenceSampler};

type Seq = Vec<u32>;

#[derive(Debug, Default)]
pub struct RetrievalModel {
    templ_to_arg: BTreeMap<Seq, BTreeSet<Seq>>,
    arg_to_templ: BTreeMap<Seq, BTreeSet<Seq>>,
    /// Known templates, in map order
    templates:    Vec<Seq>,
    /// |args(t)| / Σ |args|, aligned with `templates`
    weights:      Vec<f64>,
}

impl RetrievalModel {
    pub fn prepare<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Seq, Seq)>,
    {
        let mut templ_to_arg: BTreeMap<Seq, BTreeSet<Seq>> = BTreeMap::new();
        let mut arg_to_templ: BTreeMap<Seq, BTreeSet<Seq>> = BTreeMap::new();

        for (template, argument) in pairs {
            templ_to_arg.entry(template.clone()).or_default().insert(argument.clone());
            arg_to_templ.entry(argument).or_default().insert(template);
        }

        let templates: Vec<Seq> = templ_to_arg.keys().cloned().collect();
        let counts: Vec<usize>  = templ_to_arg.values().map(BTreeSet::len).collect();
        let total: usize        = counts.iter().sum();
        let weights = counts
            .iter()
            .map(|&c| if total > 0 { c as f64 / total as f64 } else { 0.0 })
            .collect();

        tracing::info!(
            "Retrieval model: {} templates, {} distinct arguments",
            templates.len(),
            arg_to_templ.len()
        );

        Self { templ_to_arg, arg_to_templ, templates, weights }
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn weight(&self, template: &[u32]) -> f64 {
        self.templates
            .binary_search_by(|t| t.as_slice().cmp(template))
            .map(|i| self.weights[i])
            .unwrap_or(0.0)
    }

    /// Other templates sharing an argument with `template`, once per
    /// shared argument.
    pub fn neighbors(&self, template: &[u32]) -> Vec<&Seq> {
        let Some(args) = self.templ_to_arg.get(template) else {
            return Vec::new();
        };
        args.iter()
            .filter_map(|arg| self.arg_to_templ.get(arg))
            .flatten()
            .filter(|neighbor| neighbor.as_slice() != template)
            .collect()
    }

    /// A random neighbour of `template` with score 0, or nothing when
    /// the template is unknown, weightless or isolated.
    pub fn sample_with<R: Rng + ?Sized>(&self, template: &[u32], rng: &mut R) -> Samples {
        if self.weight(template) == 0.0 {
            return Samples::empty();
        }
        match self.neighbors(template).choose(rng) {
            Some(neighbor) => Samples::single((*neighbor).clone(), 0.0),
            None           => Samples::empty(),
        }
    }

    /// Draw a known template in proportion to its weight.
    pub fn sample_template<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Seq> {
        let dist = WeightedIndex::new(&self.weights).ok()?;
        self.templates.get(dist.sample(rng))
    }
}

impl SequenceSampler for RetrievalModel {
    fn sample(&self, input: &[u32]) -> Result<Samples> {
        Ok(self.sample_with(input, &mut rand::thread_rng()))
    }
}
