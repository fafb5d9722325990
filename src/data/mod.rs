// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from XML files on disk to GPU-ready tensor
// batches, in this order:
//
//   dataIn/dataOut XML pairs
//       │
//       ▼
//   XmlPairLoader    → parses pairs into XmlTrees
//       │
//       ▼
//   flatten          → selector arrays in decreasing-fanout order
//       │
//       ▼
//   encode_pair      → vocabulary ids (TreeSample)
//       │
//       ▼
//   TreeDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   TreeBatcher      → padded tensor batches with masks
//       │
//       ▼
//   DataLoader       → feeds batches to the training loop
//
// The ToyGenerator sits upstream of all of this and writes the
// synthetic datasets the pipeline consumes.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// quick-xml based XML ↔ XmlTree conversion
pub mod parser;

/// Loads dataIn/dataOut XML pairs from a split directory
pub mod loader;

/// Synthetic toy dataset generation (reverse, rotate)
pub mod generator;

/// Tree → selector arrays in decreasing-fanout order
pub mod flatten;

/// Encoded samples and Burn's Dataset trait implementation
pub mod dataset;

/// Burn's Batcher trait implementation with tree padding/masks
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
