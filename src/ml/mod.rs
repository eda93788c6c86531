// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific model code lives here. The data layer only
// borrows Burn's Dataset/Batcher traits; the baselines and the
// application layer never touch tensors.
//
//   attention.rs  — bilinear attention over a feature sequence
//   encoder.rs    — embedding + bidirectional LSTM
//   decoder.rs    — one attentional LSTM step with optional
//                   self-attention and copy gate
//   model.rs      — encoder/decoder wiring, teacher forcing, loss
//   beam.rs       — hypothesis bookkeeping for beam search
//   decoding.rs   — greedy / sampled / beam decoding loops
//   trainer.rs    — Adam training loop with validation
//   inferencer.rs — checkpoint loading and decode modes

/// Bilinear attention
pub mod attention;

/// Bidirectional recurrent encoder
pub mod encoder;

/// Attentional decoder with copy mechanism
pub mod decoder;

/// Encoder/decoder generator
pub mod model;

/// Beam search bookkeeping
pub mod beam;

/// Autoregressive decoding
pub mod decoding;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine
pub mod inferencer;
