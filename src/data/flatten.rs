// ============================================================
// Layer 4 — Tree Flattening
// ============================================================
// Tensors don't understand trees, so every tree is flattened
// into index arrays before batching:
//
//   parent[i]   — index of node i's parent (the root points at
//                 itself, a self-loop that makes gather safe)
//   children[i] — indices of node i's children
//   fanout[i]   — children[i].len(), used by the propagator to
//                 average summed child information
//
// Nodes are listed in decreasing-fanout order (stable on
// document order), so high-connectivity nodes sit at the front
// of every selector array. The hierarchy propagator gathers
// parent and child rows through these selectors on every hop.
//
// Reference: Rust Book §8 (Vectors)

use crate::domain::xml_tree::{XmlNode, XmlTree};

/// A tree reduced to selector arrays plus per-node content.
/// Indices refer to positions within this struct's own vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTree {
    /// Open-tag token per node, e.g. "<toyrev>".
    pub tags: Vec<String>,

    /// Per-node symbol stream (attributes folded in, then text
    /// characters) — see XmlNode::content_symbols.
    pub contents: Vec<Vec<String>>,

    /// Parent selector per node; `parent[root] == root`.
    pub parent: Vec<usize>,

    /// Child selectors per node, in document order.
    pub children: Vec<Vec<usize>>,
}

impl FlatTree {
    pub fn node_count(&self) -> usize {
        self.tags.len()
    }

    pub fn fanout(&self, index: usize) -> usize {
        self.children[index].len()
    }

    pub fn max_fanout(&self) -> usize {
        self.children.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn max_content_len(&self) -> usize {
        self.contents.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Flatten a tree into selector arrays in decreasing-fanout
/// order.
pub fn flatten(tree: &XmlTree) -> FlatTree {
    // Pass 1: collect nodes and parent links in document order.
    let mut nodes:   Vec<&XmlNode> = Vec::new();
    let mut parents: Vec<usize>    = Vec::new();
    collect(&tree.root, 0, &mut nodes, &mut parents);

    // Pass 2: reorder by decreasing fanout. Sorting is stable,
    // so ties keep document order.
    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(nodes[i].fanout()));

    // old index → new index, for remapping the selectors
    let mut rank = vec![0usize; nodes.len()];
    for (new_index, &old_index) in order.iter().enumerate() {
        rank[old_index] = new_index;
    }

    let mut flat = FlatTree {
        tags:     Vec::with_capacity(nodes.len()),
        contents: Vec::with_capacity(nodes.len()),
        parent:   Vec::with_capacity(nodes.len()),
        children: Vec::with_capacity(nodes.len()),
    };

    for &old_index in &order {
        let node = nodes[old_index];
        flat.tags.push(node.open_token());
        flat.contents.push(node.content_symbols());
        flat.parent.push(rank[parents[old_index]]);
        // Children of `node` occupy consecutive document-order
        // slots right after their parent subtree start; easier
        // to just look them up through the rank table.
        let child_indices = child_slots(&parents, old_index)
            .map(|child_old| rank[child_old])
            .collect();
        flat.children.push(child_indices);
    }

    flat
}

fn collect<'t>(
    node:    &'t XmlNode,
    parent:  usize,
    nodes:   &mut Vec<&'t XmlNode>,
    parents: &mut Vec<usize>,
) {
    let index = nodes.len();
    nodes.push(node);
    parents.push(if index == 0 { 0 } else { parent });
    for child in &node.children {
        collect(child, index, nodes, parents);
    }
}

fn child_slots(parents: &[usize], parent: usize) -> impl Iterator<Item = usize> + '_ {
    (0..parents.len()).filter(move |&i| i != parent && parents[i] == parent)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn nested_tree() -> XmlTree {
        // <a><b><d/><e/></b><c/></a>
        let mut b = XmlNode::new("b");
        b.children.push(XmlNode::new("d"));
        b.children.push(XmlNode::new("e"));
        let mut a = XmlNode::new("a");
        a.children.push(b);
        a.children.push(XmlNode::new("c"));
        XmlTree::new(a)
    }

    #[test]
    fn test_selectors_stay_in_bounds() {
        let flat = flatten(&nested_tree());
        let n = flat.node_count();
        assert_eq!(n, 5);
        for i in 0..n {
            assert!(flat.parent[i] < n);
            for &c in &flat.children[i] {
                assert!(c < n);
            }
        }
    }

    #[test]
    fn test_fanouts_are_decreasing() {
        let flat = flatten(&nested_tree());
        for i in 1..flat.node_count() {
            assert!(flat.fanout(i - 1) >= flat.fanout(i));
        }
    }

    #[test]
    fn test_root_is_its_own_parent() {
        let flat = flatten(&nested_tree());
        let root = flat.tags.iter().position(|t| t == "<a>").unwrap();
        assert_eq!(flat.parent[root], root);
    }

    #[test]
    fn test_parent_child_links_agree() {
        let flat = flatten(&nested_tree());
        for i in 0..flat.node_count() {
            for &c in &flat.children[i] {
                assert_eq!(flat.parent[c], i);
            }
        }
    }

    #[test]
    fn test_single_node_tree() {
        let flat = flatten(&XmlTree::new(XmlNode::with_text("x", "q")));
        assert_eq!(flat.node_count(), 1);
        assert_eq!(flat.parent, vec![0]);
        assert_eq!(flat.children, vec![Vec::<usize>::new()]);
        assert_eq!(flat.contents[0], vec!["q"]);
        assert_eq!(flat.max_fanout(), 0);
    }

    #[test]
    fn test_tags_follow_reordering() {
        let flat = flatten(&nested_tree());
        // a and b both have fanout 2 — stable sort keeps a first.
        assert_eq!(flat.tags[0], "<a>");
        assert_eq!(flat.tags[1], "<b>");
        assert_eq!(flat.max_fanout(), 2);
    }
}
