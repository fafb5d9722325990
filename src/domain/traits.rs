// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types the
// layers above can swap implementations without changing the
// code that uses them:
//   - XmlPairLoader implements SampleSource
//   - (future) a streaming loader could implement it too
//   - Predictor implements TreePredictor
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Object Oriented Patterns)

use anyhow::Result;

use crate::domain::xml_tree::XmlTree;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can load (input, expected output) tree
/// pairs from somewhere.
pub trait SampleSource {
    /// Load all available pairs from this source.
    fn load_all(&self) -> Result<Vec<(XmlTree, XmlTree)>>;
}

// ─── TreePredictor ────────────────────────────────────────────────────────────
/// Any component that can map an input XML string to a
/// predicted output.
pub trait TreePredictor {
    /// Predict the output for one XML input. Returns the raw
    /// token stream (space-joined, ending in EOS) and the
    /// reconstructed XML string when the stream forms a tree.
    fn predict(&self, xml: &str) -> Result<Prediction>;
}

/// Result of a single prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// The decoded output tokens joined with spaces,
    /// e.g. "9 7 5 3 1 [EOS]".
    pub token_stream: String,

    /// The predicted XML document, when the token stream could
    /// be reassembled into a well-formed tree.
    pub xml: Option<String>,
}
