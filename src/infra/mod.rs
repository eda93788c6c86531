// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and inference:
//
//   checkpoint.rs      — model weights (Burn CompactRecorder),
//                        latest/best epoch pointers, and the
//                        TrainConfig JSON needed to rebuild the
//                        architecture at inference time.
//
//   tokenizer_store.rs — saves the word-level vocabulary next
//                        to the checkpoints so inference uses
//                        exactly the ids the model was trained on.
//
//   metrics.rs         — per-epoch loss/accuracy rows in a CSV.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
