// ============================================================
// Layer 4 — Seq2Seq Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<Seq2SeqSample>
// into padded tensors.
//
// Samples arrive unpadded, so each batch is padded with [PAD]
// up to its own longest input and longest output:
//
//   Input:  N samples, input lengths S_i, output lengths T_i
//   Output: inputs [N, max S_i], outputs/targets [N, max T_i]
//
// Layout is batch-first throughout the model.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::Seq2SeqSample;

/// A padded batch ready for the generator forward pass.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// Encoder tokens: [batch, src_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Decoder tokens, `[SOS] .. [EOS]`: [batch, tgt_len]
    pub outputs: Tensor<B, 2, Int>,

    /// Copy-head targets aligned with `outputs`: [batch, tgt_len]
    pub copy_targets: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    pub device: B::Device,
    pub pad:    u32,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device, pad: u32) -> Self {
        Self { device, pad }
    }

    /// Pad `rows` to a common length and build a [rows, len] Int tensor.
    fn padded(&self, rows: Vec<&[u32]>) -> Tensor<B, 2, Int> {
        let batch_size = rows.len();
        let len        = rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let flat: Vec<i32> = rows
            .iter()
            .flat_map(|r| {
                r.iter()
                    .copied()
                    .chain(std::iter::repeat(self.pad).take(len - r.len()))
                    .map(|x| x as i32)
            })
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, len])
    }
}

impl<B: Backend> Batcher<Seq2SeqSample, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<Seq2SeqSample>) -> Seq2SeqBatch<B> {
        let inputs       = self.padded(items.iter().map(|s| s.input_ids.as_slice()).collect());
        let outputs      = self.padded(items.iter().map(|s| s.output_ids.as_slice()).collect());
        let copy_targets = self.padded(items.iter().map(|s| s.copy_ids.as_slice()).collect());

        Seq2SeqBatch { inputs, outputs, copy_targets }
    }
}
