// ============================================================
// Layer 4 — XML Parser / Writer
// ============================================================
// Converts between on-disk XML text and the domain XmlTree
// using the quick-xml pull parser.
//
// The event stream from quick-xml looks like:
//   Start(<toyrev>) → Text("aB3") → End(</toyrev>) → Eof
//
// We fold that stream onto a stack of open elements: Start
// pushes a node, End pops it into its parent, Text appends to
// the node on top. Empty (<a/>) is a push+pop in one event.
//
// Reference: quick-xml crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::xml_tree::{XmlNode, XmlTree};

/// Parse one XML document from a string into a tree.
pub fn parse_str(input: &str) -> Result<XmlTree> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut done:  Option<XmlNode> = None;

    loop {
        match reader.read_event().context("XML parse error")? {
            Event::Start(e) => {
                if done.is_some() {
                    bail!("Multiple root elements in document");
                }
                stack.push(node_from_start(&e)?);
            }
            Event::Empty(e) => {
                let node = node_from_start(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => {
                        if done.is_some() {
                            bail!("Multiple root elements in document");
                        }
                        done = Some(node);
                    }
                }
            }
            Event::Text(t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                let node = match stack.pop() {
                    Some(node) => node,
                    None => bail!("Unmatched closing tag"),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => done = Some(node),
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions —
            // nothing the toy schemas produce.
            _ => {}
        }
    }

    if !stack.is_empty() {
        bail!("Unclosed element at end of document");
    }
    match done {
        Some(root) => Ok(XmlTree::new(root)),
        None => bail!("Document contains no root element"),
    }
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut node = XmlNode::new(tag);
    for attr in e.attributes() {
        let attr  = attr.context("Bad XML attribute")?;
        let name  = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attrs.push((name, value));
    }
    Ok(node)
}

/// Render a tree back to XML text. Inverse of `parse_str` for
/// trees without mixed content (text is emitted before any
/// children, which is all the toy schemas ever produce).
pub fn tree_to_string(tree: &XmlTree) -> String {
    let mut out = String::new();
    write_node(&tree.root, &mut out);
    out
}

fn write_node(node: &XmlNode, out: &mut String) {
    out.push('<');
    out.push_str(&node.tag);
    for (name, value) in &node.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    out.push('>');
    out.push_str(&escape(node.text.as_str()));
    for child in &node.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_element() {
        let tree = parse_str("<toyrev>aB3</toyrev>").unwrap();
        assert_eq!(tree.root.tag, "toyrev");
        assert_eq!(tree.root.text, "aB3");
        assert!(tree.root.children.is_empty());
    }

    #[test]
    fn test_parse_nested_with_attrs() {
        let tree = parse_str(r#"<a id="1"><b>x</b><c/></a>"#).unwrap();
        assert_eq!(tree.root.attrs, vec![("id".to_string(), "1".to_string())]);
        assert_eq!(tree.root.children.len(), 2);
        assert_eq!(tree.root.children[0].text, "x");
        assert_eq!(tree.root.children[1].tag, "c");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_str("<a><b></a>").is_err());
        assert!(parse_str("no xml here").is_err());
        assert!(parse_str("<a></a><b></b>").is_err());
    }

    #[test]
    fn test_write_parse_round_trip() {
        let input = r#"<r k="v&amp;w">t<s>u</s></r>"#;
        let tree  = parse_str(input).unwrap();
        let text  = tree_to_string(&tree);
        assert_eq!(parse_str(&text).unwrap(), tree);
        assert_eq!(tree.root.attrs[0].1, "v&w");
    }

    #[test]
    fn test_escapes_special_chars() {
        let tree = XmlTree::new(XmlNode::with_text("a", "1<2"));
        assert_eq!(tree_to_string(&tree), "<a>1&lt;2</a>");
    }
}
