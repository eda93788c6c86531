// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// works with: text pairs, decoded samples, and the seams that
// the data and model layers plug into.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// A raw (input, output) text pair as read from disk
pub mod pair;

// Decoding results and decoding modes
pub mod generation;

// Core abstractions (traits) that other layers implement
pub mod traits;
