// ============================================================
// Layer 3 — XML Tree Domain Types
// ============================================================
// The core concept of hier2hier: inputs and outputs are XML
// trees, not flat token sequences. This module defines the
// tree itself plus the token-stream view of a tree that the
// output decoder is trained against.
//
// In regular seq2seq, information flows linearly from one
// sequence position to another. In hier2hier, information
// flows linearly within text positions and then across the
// XML connectivity graph. The tree type here is the pure-data
// half of that story — no tensors, no file I/O.
//
// Reference: Rust Book §5 (Structs), §8 (Collections)

use serde::{Deserialize, Serialize};

// ─── Special Tokens ───────────────────────────────────────────────────────────
// Fixed vocabulary slots shared by the input and output sides.
// PAD must stay at id 0 — the loss masks it out by id.
pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const SOS_TOKEN: &str = "[SOS]";
pub const EOS_TOKEN: &str = "[EOS]";

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const SOS_ID: u32 = 2;
pub const EOS_ID: u32 = 3;

// Attribute delimiter tokens inside a serialized stream.
// `@name=` opens an attribute, ATTR_CLOSE ends its value.
pub const ATTR_CLOSE: &str = "@/";

/// A single XML element: tag name, ordered attributes, text
/// content, and child elements. Attribute order is preserved
/// because the toy transforms must round-trip byte-identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlNode {
    pub tag:      String,
    pub attrs:    Vec<(String, String)>,
    pub text:     String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag:      tag.into(),
            attrs:    Vec::new(),
            text:     String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(tag);
        node.text = text.into();
        node
    }

    /// Token that opens this element in a serialized stream.
    pub fn open_token(&self) -> String {
        format!("<{}>", self.tag)
    }

    /// Token that closes this element in a serialized stream.
    pub fn close_token(&self) -> String {
        format!("</{}>", self.tag)
    }

    /// Number of direct children (the node's fanout).
    pub fn fanout(&self) -> usize {
        self.children.len()
    }

    /// The per-node symbol stream the encoder consumes:
    /// attributes first (name marker, value characters, close
    /// marker), then the text content one character at a time.
    pub fn content_symbols(&self) -> Vec<String> {
        let mut symbols = Vec::new();
        for (name, value) in &self.attrs {
            symbols.push(format!("@{name}="));
            for ch in value.chars() {
                symbols.push(ch.to_string());
            }
            symbols.push(ATTR_CLOSE.to_string());
        }
        for ch in self.text.chars() {
            symbols.push(ch.to_string());
        }
        symbols
    }
}

/// A whole XML document. The root is always present — an empty
/// document is not representable, matching what the parser can
/// produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlTree {
    pub root: XmlNode,
}

impl XmlTree {
    pub fn new(root: XmlNode) -> Self {
        Self { root }
    }

    /// Total number of elements in the tree.
    pub fn node_count(&self) -> usize {
        fn count(node: &XmlNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Largest fanout of any node — the batcher pads child
    /// selector lists to this width.
    pub fn max_fanout(&self) -> usize {
        fn walk(node: &XmlNode) -> usize {
            node.children.iter().map(walk).max().unwrap_or(0).max(node.fanout())
        }
        walk(&self.root)
    }

    /// Serialize the tree into the flat token stream the output
    /// decoder is trained to produce. One token per structural
    /// marker, one token per text/attribute character:
    ///
    ///   <toyrev> 9 7 5 3 1 </toyrev>
    ///
    /// SOS/EOS are *not* included — the dataset layer adds them.
    pub fn serialize_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        serialize_node(&self.root, &mut tokens);
        tokens
    }
}

fn serialize_node(node: &XmlNode, out: &mut Vec<String>) {
    out.push(node.open_token());
    for (name, value) in &node.attrs {
        out.push(format!("@{name}="));
        for ch in value.chars() {
            out.push(ch.to_string());
        }
        out.push(ATTR_CLOSE.to_string());
    }
    for ch in node.text.chars() {
        out.push(ch.to_string());
    }
    for child in &node.children {
        serialize_node(child, out);
    }
    out.push(node.close_token());
}

/// Rebuild a tree from a serialized token stream. This is the
/// inverse of `serialize_tokens` for well-formed streams, and a
/// best-effort reconstruction for model output: unmatched close
/// tokens are ignored, an unterminated tree is closed at EOF.
/// Returns `None` when no root element can be recovered at all.
pub fn tokens_to_tree(tokens: &[String]) -> Option<XmlTree> {
    // Stack of open elements; `attr` holds an attribute name
    // while its value characters are being collected.
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut done: Option<XmlNode> = None;
    let mut attr: Option<(String, String)> = None;

    for token in tokens {
        if token == SOS_TOKEN || token == PAD_TOKEN || token == UNK_TOKEN {
            continue;
        }
        if token == EOS_TOKEN {
            break;
        }
        if let Some(tag) = token.strip_prefix("</").and_then(|t| t.strip_suffix('>')) {
            // Close the innermost matching element.
            if let Some((open_attr, node)) = attr.take().zip(stack.last_mut()) {
                node.attrs.push(open_attr);
            }
            if stack.last().map(|n| n.tag.as_str()) == Some(tag) {
                let node = stack.pop().unwrap_or_else(|| XmlNode::new(tag));
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        done = Some(node);
                        break;
                    }
                }
            }
            continue;
        }
        if let Some(tag) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            if let Some((open_attr, node)) = attr.take().zip(stack.last_mut()) {
                node.attrs.push(open_attr);
            }
            stack.push(XmlNode::new(tag));
            continue;
        }
        if let Some(name) = token.strip_prefix('@').and_then(|t| t.strip_suffix('=')) {
            if let Some((open_attr, node)) = attr.take().zip(stack.last_mut()) {
                node.attrs.push(open_attr);
            }
            attr = Some((name.to_string(), String::new()));
            continue;
        }
        if token == ATTR_CLOSE {
            if let Some((open_attr, node)) = attr.take().zip(stack.last_mut()) {
                node.attrs.push(open_attr);
            }
            continue;
        }
        // Plain character token: attribute value if one is open,
        // text content otherwise.
        match (&mut attr, stack.last_mut()) {
            (Some((_, value)), _) => value.push_str(token),
            (None, Some(node))    => node.text.push_str(token),
            (None, None)          => {}
        }
    }

    // Unterminated stream from the model: fold remaining open
    // elements into each other so we still return something.
    while let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => done = Some(node),
        }
    }

    done.map(XmlTree::new)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> XmlTree {
        let mut root = XmlNode::with_text("toyrev", "ab");
        root.attrs.push(("id".to_string(), "x7".to_string()));
        root.children.push(XmlNode::with_text("inner", "z"));
        XmlTree::new(root)
    }

    #[test]
    fn test_serialize_token_order() {
        let tokens = sample_tree().serialize_tokens();
        assert_eq!(
            tokens,
            vec![
                "<toyrev>", "@id=", "x", "7", "@/", "a", "b",
                "<inner>", "z", "</inner>", "</toyrev>",
            ]
        );
    }

    #[test]
    fn test_tokens_round_trip() {
        let tree   = sample_tree();
        let tokens = tree.serialize_tokens();
        let back   = tokens_to_tree(&tokens).expect("round trip");
        assert_eq!(back, tree);
    }

    #[test]
    fn test_unterminated_stream_recovers() {
        let tokens: Vec<String> = ["<a>", "x", "<b>", "y"]
            .iter().map(|s| s.to_string()).collect();
        let tree = tokens_to_tree(&tokens).expect("partial tree");
        assert_eq!(tree.root.tag, "a");
        assert_eq!(tree.root.children[0].tag, "b");
        assert_eq!(tree.root.children[0].text, "y");
    }

    #[test]
    fn test_eos_stops_parsing() {
        let tokens: Vec<String> = ["<a>", "x", "</a>", EOS_TOKEN, "<b>", "</b>"]
            .iter().map(|s| s.to_string()).collect();
        let tree = tokens_to_tree(&tokens).expect("tree");
        assert_eq!(tree.root.tag, "a");
        assert!(tree.root.children.is_empty());
    }

    #[test]
    fn test_garbage_stream_yields_none() {
        let tokens: Vec<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        assert!(tokens_to_tree(&tokens).is_none());
    }

    #[test]
    fn test_node_count_and_fanout() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.max_fanout(), 1);
    }

    #[test]
    fn test_content_symbols_fold_attrs_before_text() {
        let tree = sample_tree();
        let syms = tree.root.content_symbols();
        assert_eq!(syms, vec!["@id=", "x", "7", "@/", "a", "b"]);
    }
}
