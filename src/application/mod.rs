// ============================================================
// Layer 2 — Application Layer (Use Cases)
// ============================================================
// One use case per CLI command, each orchestrating the layers
// below without knowing about clap or terminals beyond plain
// println output:
//
//   generate_use_case — synthesize a toy dataset on disk
//   train_use_case    — full training run + interactive prompt
//   evaluate_use_case — score a checkpoint on a test split
//
// Reference: Rust Book §7 (Packages, Crates and Modules)

/// Toy dataset generation
pub mod generate_use_case;

/// Training orchestration and the post-training prompt
pub mod train_use_case;

/// Held-out evaluation of a trained checkpoint
pub mod evaluate_use_case;
