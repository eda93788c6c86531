use burn::{
    nn::{Linear, LinearConfig, LstmState},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::Seq2SeqBatch;
use crate::ml::decoder::{AttentionMemory, Decoder, DecoderConfig};
use crate::ml::encoder::{Encoder, EncoderConfig};

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    pub vocab_size: usize,
    pub pad:        usize,
    #[config(default = 64)]
    pub n_emb:      usize,
    #[config(default = 512)]
    pub n_enc:      usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
    #[config(default = false)]
    pub copy:           bool,
    #[config(default = false)]
    pub self_attention: bool,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GeneratorModel<B> {
        let encoder = EncoderConfig::new(self.vocab_size, self.n_emb, self.n_enc)
            .with_dropout(self.dropout)
            .init(device);
        let decoder = DecoderConfig::new(self.vocab_size, self.n_emb, self.n_enc)
            .with_copy(self.copy)
            .with_self_attention(self.self_attention)
            .with_dropout(self.dropout)
            .init(device);
        GeneratorModel {
            encoder,
            proj: LinearConfig::new(self.n_enc * 2, self.n_enc).init(device),
            decoder,
            pad: self.pad,
        }
    }
}

/// Bidirectional LSTM encoder + attentional LSTM decoder.
#[derive(Module, Debug)]
pub struct GeneratorModel<B: Backend> {
    pub encoder: Encoder<B>,
    /// Folds the two encoder directions into the decoder width
    pub proj:    Linear<B>,
    pub decoder: Decoder<B>,
    pub pad:     usize,
}

/// Teacher-forced predictions for every target position after `[SOS]`.
pub struct GeneratorOutput<B: Backend> {
    /// [batch, tgt_len - 1, vocab]
    pub log_probs:     Tensor<B, 3>,
    /// [batch, tgt_len - 1, vocab]
    pub direct_logits: Tensor<B, 3>,
    /// [batch, tgt_len - 1, vocab]
    pub copy_logits:   Tensor<B, 3>,
}

impl<B: Backend> GeneratorModel<B> {
    /// Encode `inputs` ([batch, src_len]) into the attention memory and
    /// the decoder's initial state. The two directional final states are
    /// summed into one [batch, n_enc] state.
    pub fn encode(&self, inputs: Tensor<B, 2, Int>) -> (AttentionMemory<B>, LstmState<B, 2>) {
        let pad_mask = inputs.clone().equal_elem(self.pad as i64);
        let (features, state) = self.encoder.forward(inputs.clone());
        let features = self.proj.forward(features);

        let [_, batch, n_hidden] = state.hidden.dims();
        let cell   = state.cell.sum_dim(0).reshape([batch, n_hidden]);
        let hidden = state.hidden.sum_dim(0).reshape([batch, n_hidden]);

        let memory = AttentionMemory { features, tokens: inputs, pad_mask };
        (memory, LstmState::new(cell, hidden))
    }

    /// Teacher forcing: feed `outputs[:, t]` and predict `outputs[:, t + 1]`.
    pub fn forward(&self, inputs: Tensor<B, 2, Int>, outputs: Tensor<B, 2, Int>) -> GeneratorOutput<B> {
        let (memory, mut state) = self.encode(inputs);
        let [batch, tgt_len] = outputs.dims();
        let steps = tgt_len.saturating_sub(1);

        let mut history       = Vec::new();
        let mut log_probs     = Vec::with_capacity(steps);
        let mut direct_logits = Vec::with_capacity(steps);
        let mut copy_logits   = Vec::with_capacity(steps);

        for t in 0..steps {
            let prev = outputs.clone().slice([0..batch, t..t + 1]).reshape([batch]);
            let step = self.decoder.step(prev, state, &memory, &history);
            state = step.state;
            if self.decoder.uses_self_attention() {
                history.push(step.hidden);
            }
            log_probs.push(step.log_probs);
            direct_logits.push(step.direct_logits);
            copy_logits.push(step.copy_logits);
        }

        GeneratorOutput {
            log_probs:     Tensor::stack(log_probs, 1),
            direct_logits: Tensor::stack(direct_logits, 1),
            copy_logits:   Tensor::stack(copy_logits, 1),
        }
    }

    /// Cross-entropy over all non-pad next-token positions.
    ///
    /// Without copy supervision the loss scores the final (possibly
    /// copy-mixed) distribution. With it, the direct head is scored
    /// against the next tokens and the copy head against the copy
    /// targets, and the two losses are added.
    pub fn forward_loss(
        &self,
        batch:            Seq2SeqBatch<B>,
        copy_supervision: bool,
    ) -> (Tensor<B, 1>, GeneratorOutput<B>) {
        let output = self.forward(batch.inputs, batch.outputs.clone());
        let next   = next_tokens(batch.outputs);

        let [n_batch, n_seq, vocab] = output.log_probs.dims();
        let flat = |t: &Tensor<B, 3>| t.clone().reshape([n_batch * n_seq, vocab]);

        let loss = if copy_supervision {
            let copy_next = next_tokens(batch.copy_targets);
            masked_nll(flat(&output.direct_logits), next, self.pad)
                + masked_nll(flat(&output.copy_logits), copy_next, self.pad)
        } else {
            // log_softmax of log-probabilities is the identity, so the
            // mixed distribution can be scored like logits
            masked_nll(flat(&output.log_probs), next, self.pad)
        };

        (loss, output)
    }
}

/// Mean negative log-likelihood of `targets` under `logits` ([N, vocab]),
/// averaged over the positions whose target is not `pad`.
pub fn masked_nll<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>, pad: usize) -> Tensor<B, 1> {
    let [n] = targets.dims();
    let picked = log_softmax(logits, 1)
        .gather(1, targets.clone().reshape([n, 1]))
        .reshape([n]);
    let counted = targets.equal_elem(pad as i64).bool_not().float();
    let total   = counted.clone().sum().clamp_min(1.0);

    (picked * counted).sum().neg() / total
}

/// `targets[:, 1:]` flattened to [batch * (len - 1)].
pub fn next_tokens<B: Backend>(targets: Tensor<B, 2, Int>) -> Tensor<B, 1, Int> {
    let [batch, len] = targets.dims();
    targets
        .slice([0..batch, 1..len])
        .reshape([batch * (len - 1)])
}
