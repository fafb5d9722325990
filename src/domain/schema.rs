// ============================================================
// Layer 3 — Toy Schemas
// ============================================================
// Each toy schema is a synthetic XML-to-XML task: a recipe for
// generating a random input tree and the deterministic
// transform that produces the expected output tree. These are
// smoke-test benchmarks for the training pipeline, not real
// datasets.
//
//   reverse — one element wrapping a random string; the output
//             is the same element with the string reversed.
//             After training, input "1 3 5 7 9" must decode to
//             "9 7 5 3 1 EOS".
//   rotate  — a root with one child; the output detaches the
//             child and re-attaches the old root beneath it,
//             so the child becomes the new root.
//
// Reference: Rust Book §6 (Enums), §10 (Traits)

use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::xml_tree::{XmlNode, XmlTree};

/// The synthetic task to generate data for and train on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToySchema {
    Reverse,
    Rotate,
}

impl ToySchema {
    /// Apply the schema's tree transform to an input tree,
    /// producing the expected output tree.
    pub fn transform(&self, tree: &XmlTree) -> Result<XmlTree> {
        match self {
            ToySchema::Reverse => reverse_transform(tree),
            ToySchema::Rotate  => rotate_transform(tree),
        }
    }
}

impl FromStr for ToySchema {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reverse" | "toy0" => Ok(ToySchema::Reverse),
            "rotate"  | "toy1" => Ok(ToySchema::Rotate),
            other => bail!("Unknown schema '{other}' (expected 'reverse' or 'rotate')"),
        }
    }
}

impl std::fmt::Display for ToySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToySchema::Reverse => write!(f, "reverse"),
            ToySchema::Rotate  => write!(f, "rotate"),
        }
    }
}

/// Reverse the text content of the root element.
/// The root must be a leaf — that is what the generator emits.
fn reverse_transform(tree: &XmlTree) -> Result<XmlTree> {
    if !tree.root.children.is_empty() {
        bail!(
            "reverse schema expects a leaf root, got {} children",
            tree.root.children.len()
        );
    }
    let mut root = tree.root.clone();
    root.text = root.text.chars().rev().collect();
    Ok(XmlTree::new(root))
}

/// Rotate the first child up to become the new root, with the
/// old root (minus that child) appended beneath it.
fn rotate_transform(tree: &XmlTree) -> Result<XmlTree> {
    if tree.root.children.is_empty() {
        bail!("rotate schema expects the root to have at least one child");
    }
    let mut old_root  = tree.root.clone();
    let mut new_root  = old_root.children.remove(0);
    new_root.children.push(old_root);
    Ok(XmlTree::new(new_root))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_reverses_text() {
        let tree = XmlTree::new(XmlNode::with_text("toyrev", "abc"));
        let out  = ToySchema::Reverse.transform(&tree).unwrap();
        assert_eq!(out.root.text, "cba");
        assert_eq!(out.root.tag, "toyrev");
    }

    #[test]
    fn test_reverse_rejects_nested_root() {
        let mut root = XmlNode::new("a");
        root.children.push(XmlNode::new("b"));
        assert!(ToySchema::Reverse.transform(&XmlTree::new(root)).is_err());
    }

    #[test]
    fn test_rotate_child_becomes_root() {
        let mut root = XmlNode::new("outer");
        root.children.push(XmlNode::new("inner"));
        let out = ToySchema::Rotate.transform(&XmlTree::new(root)).unwrap();
        assert_eq!(out.root.tag, "inner");
        assert_eq!(out.root.children.len(), 1);
        assert_eq!(out.root.children[0].tag, "outer");
        assert!(out.root.children[0].children.is_empty());
    }

    #[test]
    fn test_rotate_requires_child() {
        let tree = XmlTree::new(XmlNode::new("lonely"));
        assert!(ToySchema::Rotate.transform(&tree).is_err());
    }

    #[test]
    fn test_schema_parse_names() {
        assert_eq!("reverse".parse::<ToySchema>().unwrap(), ToySchema::Reverse);
        assert_eq!("toy1".parse::<ToySchema>().unwrap(), ToySchema::Rotate);
        assert!("toy9".parse::<ToySchema>().is_err());
    }
}
