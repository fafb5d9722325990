// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns shared by training and
// inference:
//
//   checkpoint.rs  — experiment directory layout, encoder and
//                    decoder weight records (CompactRecorder),
//                    train config JSON, latest-checkpoint
//                    pointer
//   vocab_store.rs — input/output vocabulary persistence as
//                    HuggingFace tokenizer JSON; training and
//                    inference must agree on every id
//   metrics.rs     — epoch metrics CSV for learning curves
//
// Keeping these out of the data/ml layers means a checkpoint
// is a plain directory any layer can reason about.
//
// Reference: Rust Book §7 (Modules), §9 (anyhow)
//            Burn Book §5 (Checkpointing)

/// Experiment layout, model weight checkpoints, config JSON
pub mod checkpoint;

/// Input/output vocabulary building and persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
