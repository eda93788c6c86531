// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing.
// Each use case wires data, model and infra layers together
// for one CLI command.
//
//   train_use_case.rs    — data dir → vocab → checkpoints
//   generate_use_case.rs — checkpoint → decoded strings
//   baseline_use_case.rs — retrieval and lookup baselines,
//                          built in memory from the data dir

/// The training workflow
pub mod train_use_case;

/// Neural generation from a trained checkpoint
pub mod generate_use_case;

/// Non-neural baselines
pub mod baseline_use_case;
