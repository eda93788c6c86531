// ============================================================
// Layer 5 — Attentional Decoder
// ============================================================
// One decoding step:
//
//   prev token ──► Embedding ──► LSTM ──► h
//                                          │
//          encoder features ◄── attention ─┤──► ctx
//        own past h (optional) ◄── self ───┘──► self_ctx
//
//   out    = tanh(W [h; ctx; self_ctx])
//   direct = V out                       (vocabulary logits)
//
// With the copy mechanism a gate g = σ(G out) mixes generation
// with copying:
//
//   p(w) = (1 - g) softmax(direct)_w + g Σ_{s: src_s = w} a_s
//
// where a_s are the attention weights over source positions.
// Steps return log-probabilities so greedy, sampled and beam
// decoding can consume them directly.

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig, LstmState},
    prelude::*,
    tensor::activation::{log_softmax, sigmoid, softmax},
};

use crate::ml::attention::{SimpleAttention, SimpleAttentionConfig};

/// Floor applied before taking the log of a probability.
const PROB_FLOOR: f32 = 1.0e-10;

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub vocab_size: usize,
    pub n_emb:      usize,
    pub n_hidden:   usize,
    #[config(default = false)]
    pub copy:           bool,
    #[config(default = false)]
    pub self_attention: bool,
    #[config(default = 0.0)]
    pub dropout:        f64,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let n_combined = self.n_hidden * if self.self_attention { 3 } else { 2 };
        Decoder {
            embedding:      EmbeddingConfig::new(self.vocab_size, self.n_emb).init(device),
            lstm:           LstmConfig::new(self.n_emb, self.n_hidden, true).init(device),
            attention:      SimpleAttentionConfig::new(self.n_hidden, self.n_hidden).init(device),
            self_attention: self
                .self_attention
                .then(|| SimpleAttentionConfig::new(self.n_hidden, self.n_hidden).init(device)),
            combine:        LinearConfig::new(n_combined, self.n_hidden).init(device),
            vocab_proj:     LinearConfig::new(self.n_hidden, self.vocab_size).init(device),
            copy_switch:    self.copy.then(|| LinearConfig::new(self.n_hidden, 1).init(device)),
            dropout:        DropoutConfig::new(self.dropout).init(),
            vocab_size:     self.vocab_size,
            n_hidden:       self.n_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    embedding:      Embedding<B>,
    lstm:           Lstm<B>,
    attention:      SimpleAttention<B>,
    self_attention: Option<SimpleAttention<B>>,
    combine:        Linear<B>,
    vocab_proj:     Linear<B>,
    copy_switch:    Option<Linear<B>>,
    dropout:        Dropout,
    vocab_size:     usize,
    n_hidden:       usize,
}

/// What the decoder attends to: projected encoder features and the
/// source tokens they came from.
#[derive(Debug, Clone)]
pub struct AttentionMemory<B: Backend> {
    /// [batch, src_len, n_hidden]
    pub features: Tensor<B, 3>,
    /// [batch, src_len]
    pub tokens:   Tensor<B, 2, Int>,
    /// [batch, src_len], true at padding
    pub pad_mask: Tensor<B, 2, Bool>,
}

impl<B: Backend> AttentionMemory<B> {
    /// Broadcast a single-row memory to `rows` identical rows.
    pub fn repeat_rows(&self, rows: usize) -> Self {
        let [_, len, width] = self.features.dims();
        Self {
            features: self.features.clone().expand([rows, len, width]),
            tokens:   self.tokens.clone().expand([rows, len]),
            pad_mask: self.pad_mask.clone().expand([rows, len]),
        }
    }
}

pub struct DecoderStep<B: Backend> {
    /// Output distribution, log-space: [batch, vocab]
    pub log_probs:     Tensor<B, 2>,
    /// Generation logits before any copy mixing: [batch, vocab]
    pub direct_logits: Tensor<B, 2>,
    /// Log of the copy distribution projected onto the vocabulary: [batch, vocab]
    pub copy_logits:   Tensor<B, 2>,
    /// Recurrent state after this step
    pub state:         LstmState<B, 2>,
    /// Raw LSTM output, the self-attention history entry: [batch, n_hidden]
    pub hidden:        Tensor<B, 2>,
}

/// [batch, src_len] ids → [batch, src_len, vocab] float indicator.
fn source_one_hot<B: Backend>(tokens: Tensor<B, 2, Int>, vocab_size: usize) -> Tensor<B, 3> {
    let [batch, len] = tokens.dims();
    let ids = Tensor::<B, 1, Int>::arange(0..vocab_size as i64, &tokens.device())
        .reshape([1, 1, vocab_size])
        .expand([batch, len, vocab_size]);
    tokens
        .unsqueeze_dim::<3>(2)
        .expand([batch, len, vocab_size])
        .equal(ids)
        .float()
}

impl<B: Backend> Decoder<B> {
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn uses_self_attention(&self) -> bool {
        self.self_attention.is_some()
    }

    /// Run one step for a batch of previous tokens `prev` ([batch]).
    ///
    /// `history` holds the `hidden` of every earlier step, oldest first;
    /// it is only read when self-attention is enabled.
    pub fn step(
        &self,
        prev:    Tensor<B, 1, Int>,
        state:   LstmState<B, 2>,
        memory:  &AttentionMemory<B>,
        history: &[Tensor<B, 2>],
    ) -> DecoderStep<B> {
        let [batch] = prev.dims();

        let emb = self.dropout.forward(self.embedding.forward(prev.reshape([batch, 1])));
        let (out, state) = self.lstm.forward(emb, Some(state));
        let hidden = out.reshape([batch, self.n_hidden]);

        let (context, weights) = self.attention.forward(
            hidden.clone(),
            memory.features.clone(),
            Some(memory.pad_mask.clone()),
        );

        let mut parts = vec![hidden.clone(), context];
        if let Some(self_attention) = &self.self_attention {
            let self_context = if history.is_empty() {
                hidden.zeros_like()
            } else {
                let past = Tensor::stack::<3>(history.to_vec(), 1); // [batch, t, n_hidden]
                self_attention.forward(hidden.clone(), past, None).0
            };
            parts.push(self_context);
        }

        let combined = self.combine.forward(Tensor::cat(parts, 1)).tanh();
        let combined = self.dropout.forward(combined);
        let direct_logits = self.vocab_proj.forward(combined.clone());

        // Attention mass per vocabulary id: repeated source tokens accumulate
        let copy_probs = weights
            .unsqueeze_dim::<3>(1) // [batch, 1, src_len]
            .matmul(source_one_hot(memory.tokens.clone(), self.vocab_size))
            .reshape([batch, self.vocab_size]);
        let copy_logits = copy_probs.clone().clamp_min(PROB_FLOOR).log();

        let log_probs = match &self.copy_switch {
            Some(switch) => {
                let gate = sigmoid(switch.forward(combined)).expand([batch, self.vocab_size]);
                let generate = softmax(direct_logits.clone(), 1);
                let mixed = generate * (gate.ones_like() - gate.clone()) + copy_probs * gate;
                mixed.clamp_min(PROB_FLOOR).log()
            }
            None => log_softmax(direct_logits.clone(), 1),
        };

        DecoderStep { log_probs, direct_logits, copy_logits, state, hidden }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn memory(device: &<TestBackend as Backend>::Device) -> AttentionMemory<TestBackend> {
        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([2, 6, 7, 3, 2, 8, 3, 0], device)
            .reshape([2, 4]);
        AttentionMemory {
            features: Tensor::random([2, 4, 5], burn::tensor::Distribution::Default, device),
            pad_mask: tokens.clone().equal_elem(0),
            tokens,
        }
    }

    fn initial_state(device: &<TestBackend as Backend>::Device) -> LstmState<TestBackend, 2> {
        LstmState::new(Tensor::zeros([2, 5], device), Tensor::zeros([2, 5], device))
    }

    fn row_mass(log_probs: Tensor<TestBackend, 2>) -> Vec<f32> {
        log_probs.exp().sum_dim(1).into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_step_shapes_and_normalised_output() {
        let device  = Default::default();
        let decoder = DecoderConfig::new(12, 4, 5).init::<TestBackend>(&device);
        let prev    = Tensor::<TestBackend, 1, Int>::from_ints([2, 2], &device);

        let step = decoder.step(prev, initial_state(&device), &memory(&device), &[]);
        assert_eq!(step.log_probs.dims(), [2, 12]);
        assert_eq!(step.direct_logits.dims(), [2, 12]);
        assert_eq!(step.hidden.dims(), [2, 5]);
        for mass in row_mass(step.log_probs) {
            assert!((mass - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_copy_mixture_is_a_distribution() {
        let device  = Default::default();
        let decoder = DecoderConfig::new(12, 4, 5)
            .with_copy(true)
            .with_self_attention(true)
            .init::<TestBackend>(&device);
        let memory  = memory(&device);
        let prev    = Tensor::<TestBackend, 1, Int>::from_ints([2, 2], &device);

        let first  = decoder.step(prev.clone(), initial_state(&device), &memory, &[]);
        let second = decoder.step(prev, first.state, &memory, &[first.hidden]);
        for mass in row_mass(second.log_probs) {
            assert!((mass - 1.0).abs() < 1e-3);
        }

        // Copy mass only lands on tokens present in the source row
        let copy: Vec<f32> = second.copy_logits.exp().into_data().convert::<f32>().to_vec().unwrap();
        assert!(copy[9] < 1e-6);  // row 0, token 9 absent
        assert!(copy[12] < 1e-6); // row 1, [PAD] is masked out
    }

    #[test]
    fn test_source_one_hot_accumulates_repeats() {
        let device  = Default::default();
        let tokens  = Tensor::<TestBackend, 1, Int>::from_ints([5, 2, 5], &device).reshape([1, 3]);
        let weights = Tensor::<TestBackend, 1>::from_floats([0.25, 0.5, 0.25], &device).reshape([1, 1, 3]);

        let mass: Vec<f32> = weights
            .matmul(source_one_hot(tokens, 6))
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap();
        assert_eq!(mass, vec![0.0, 0.0, 0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_repeat_rows() {
        let device = Default::default();
        let tokens = Tensor::<TestBackend, 1, Int>::from_ints([2, 6, 3], &device).reshape([1, 3]);
        let memory = AttentionMemory::<TestBackend> {
            features: Tensor::zeros([1, 3, 5], &device),
            pad_mask: tokens.clone().equal_elem(0),
            tokens,
        };
        let repeated = memory.repeat_rows(4);
        assert_eq!(repeated.features.dims(), [4, 3, 5]);
        assert_eq!(repeated.tokens.dims(), [4, 3]);
        assert_eq!(repeated.pad_mask.dims(), [4, 3]);
    }
}
