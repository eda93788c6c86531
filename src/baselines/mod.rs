// ============================================================
// Layer 5 — Non-neural Baselines
// ============================================================
// Two reference points for the neural generator, both built
// from the same token-id corpus and neither touching tensors:
//
//   retrieval.rs — templates (inputs with one span replaced by
//                  [HOLE]) linked through shared arguments; a
//                  query template is answered with a random
//                  neighbouring template.
//
//   lookup.rs    — memorises which sequences co-occurred in
//                  random training draws and counts tokens.

/// Template/argument co-occurrence retrieval
pub mod retrieval;

/// Frequency-counting lookup table
pub mod lookup;
