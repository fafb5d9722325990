// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// The heart of the toolkit — pure Rust structs, enums and
// traits defining what hier2hier works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO ML-specific code
//
// Why keep this layer pure?
//   - Easy to unit test (no GPU needed)
//   - Easy to understand (no framework noise)
//   - Easy to swap implementations (just implement the trait)
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// XML tree types and the token-stream view of a tree
pub mod xml_tree;

// Synthetic toy tasks (reverse, rotate) and their transforms
pub mod schema;

// Core abstractions (traits) that other layers implement
pub mod traits;
