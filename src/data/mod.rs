// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from tab-separated text files to padded tensor
// batches.
//
//   train.tsv / val.tsv
//       │
//       ▼
//   TsvPairLoader     → reads lines, splits input/output
//       │
//       ▼
//   Preprocessor      → normalises whitespace and control chars
//       │
//       ▼
//   Vocab             → word-level tokenizer with fixed specials
//       │
//       ▼
//   Seq2SeqCorpus     → id pairs, random draws, template enumeration
//       │
//       ▼
//   Seq2SeqDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   Seq2SeqBatcher    → pads each batch to its longest sequence
//
// The baselines stop at Seq2SeqCorpus; only the neural model
// goes all the way to tensors.

/// Reads `input<TAB>output` files
pub mod loader;

/// Cleans raw text fields
pub mod preprocessor;

/// Word-level vocabulary backed by a HuggingFace tokenizer
pub mod vocab;

/// Token-id corpus and Burn Dataset
pub mod dataset;

/// Implements Burn's Batcher trait with dynamic padding
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
