// ============================================================
// Layer 5 — Machine Learning Layer
// ============================================================
// Everything tensor-shaped lives here:
//
//   model.rs     — node encoder, hierarchy propagator, decoder
//   trainer.rs   — training/validation loop (Autodiff backend)
//   predictor.rs — checkpoint loading and greedy inference
//
// The layers above only ever see datasets, configs and the
// TreePredictor trait; tensors never leak upward.
//
// Reference: Burn Book

/// Model architecture: encoder, propagator, decoder
pub mod model;

/// Training and validation loop
pub mod trainer;

/// Inference from a saved checkpoint
pub mod predictor;
