//! Character node and node storage for the tree-text CRDT.
//!
//! Every character ever inserted lives in a [`NodeStore`] arena and is
//! addressed by a stable [`NodeRef`] handle. A single [`CharNode`] struct
//! embeds all four link sets a node participates in: its interleaving-tree
//! position, its balanced-index links, and its membership in one left-spine
//! and one right-spine list. Embedding keeps navigation a single arena hop
//! instead of four map lookups.
//!
//! Nodes are never removed; deletion tombstones them in place so concurrent
//! insertions keep their anchors.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::crdt::types::UniqueId;

/// Sentinel character carried by the root node. The root is never part of the
/// visible text; the character only shows up in debug dumps.
pub const ROOT_SENTINEL_CHAR: char = '\u{2388}';

/// Index into the node arena. `u32` supports up to ~4 billion nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u32);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which side of its parent a node hangs on in the interleaving tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One node's membership links in a spine list (a positionally keyed AVL
/// tree with stored heights; a detached singleton has height 0).
#[derive(Debug, Clone, Copy)]
pub struct SpineLinks {
    pub parent: Option<NodeRef>,
    pub left: Option<NodeRef>,
    pub right: Option<NodeRef>,
    pub height: i32,
}

impl Default for SpineLinks {
    fn default() -> Self {
        SpineLinks {
            parent: None,
            left: None,
            right: None,
            height: 0,
        }
    }
}

/// A single character within the document.
#[derive(Debug, Clone)]
pub struct CharNode {
    /// Unique identifier; determines rank among same-side siblings.
    pub id: UniqueId,
    /// The character content of this node.
    pub value: char,
    /// Interleaving-tree parent (`None` only for the root sentinel).
    pub parent: Option<NodeRef>,
    /// Which side of the parent this node was anchored on.
    pub side: Side,
    /// False once the character has been deleted (tombstone).
    pub is_present: bool,
    /// Left-side children, sorted ascending by id.
    pub left_children: Vec<NodeRef>,
    /// Right-side children, sorted ascending by id.
    pub right_children: Vec<NodeRef>,

    /// Balanced-index parent.
    pub b_parent: Option<NodeRef>,
    /// Balanced-index left child.
    pub b_left: Option<NodeRef>,
    /// Balanced-index right child.
    pub b_right: Option<NodeRef>,
    /// AVL balance factor: height(right) - height(left), in {-1, 0, +1}.
    pub b_factor: i8,
    /// Number of present nodes in the balanced subtree rooted here,
    /// including this node if present.
    pub b_count: usize,

    /// Membership in this node's left-spine list.
    pub left_spine: SpineLinks,
    /// Membership in this node's right-spine list.
    pub right_spine: SpineLinks,
}

impl CharNode {
    /// Creates a new present character node anchored under `parent`.
    pub fn new(id: UniqueId, value: char, parent: NodeRef, side: Side) -> Self {
        CharNode {
            id,
            value,
            parent: Some(parent),
            side,
            is_present: true,
            left_children: Vec::new(),
            right_children: Vec::new(),
            b_parent: None,
            b_left: None,
            b_right: None,
            b_factor: 0,
            b_count: 1,
            left_spine: SpineLinks::default(),
            right_spine: SpineLinks::default(),
        }
    }

    /// Creates the root sentinel: no parent, never present, empty content.
    pub fn root_sentinel() -> Self {
        CharNode {
            id: UniqueId::root(),
            value: ROOT_SENTINEL_CHAR,
            parent: None,
            side: Side::Right,
            is_present: false,
            left_children: Vec::new(),
            right_children: Vec::new(),
            b_parent: None,
            b_left: None,
            b_right: None,
            b_factor: 0,
            b_count: 0,
            left_spine: SpineLinks::default(),
            right_spine: SpineLinks::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn spine(&self, side: Side) -> &SpineLinks {
        match side {
            Side::Left => &self.left_spine,
            Side::Right => &self.right_spine,
        }
    }

    pub fn spine_mut(&mut self, side: Side) -> &mut SpineLinks {
        match side {
            Side::Left => &mut self.left_spine,
            Side::Right => &mut self.right_spine,
        }
    }

    pub fn children(&self, side: Side) -> &[NodeRef] {
        match side {
            Side::Left => &self.left_children,
            Side::Right => &self.right_children,
        }
    }

    pub fn children_mut(&mut self, side: Side) -> &mut Vec<NodeRef> {
        match side {
            Side::Left => &mut self.left_children,
            Side::Right => &mut self.right_children,
        }
    }
}

/// Arena of all character nodes plus the id directory.
///
/// The store owns every node; all tree links are plain `NodeRef` handles into
/// it, never followed for ownership.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<CharNode>,
    directory: HashMap<UniqueId, NodeRef>,
}

impl NodeStore {
    pub fn new() -> Self {
        NodeStore::default()
    }

    /// Adds a node to the arena and directory, returning its handle.
    pub fn insert(&mut self, node: CharNode) -> NodeRef {
        let handle = NodeRef(self.nodes.len() as u32);
        self.directory.insert(node.id, handle);
        self.nodes.push(node);
        handle
    }

    /// Resolves an id to its arena handle.
    pub fn lookup(&self, id: &UniqueId) -> Option<NodeRef> {
        self.directory.get(id).copied()
    }

    /// Total node count, tombstones and sentinel included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all handles in allocation order.
    pub fn handles(&self) -> impl Iterator<Item = NodeRef> {
        (0..self.nodes.len() as u32).map(NodeRef)
    }
}

impl Index<NodeRef> for NodeStore {
    type Output = CharNode;

    fn index(&self, handle: NodeRef) -> &CharNode {
        &self.nodes[handle.index()]
    }
}

impl IndexMut<NodeRef> for NodeStore {
    fn index_mut(&mut self, handle: NodeRef) -> &mut CharNode {
        &mut self.nodes[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_insert_and_lookup() {
        let mut store = NodeStore::new();
        let root = store.insert(CharNode::root_sentinel());
        let id = UniqueId::new(1, 1);
        let child = store.insert(CharNode::new(id, 'a', root, Side::Right));

        assert_eq!(store.node_count(), 2);
        assert_eq!(store.lookup(&UniqueId::root()), Some(root));
        assert_eq!(store.lookup(&id), Some(child));
        assert_eq!(store.lookup(&UniqueId::new(2, 1)), None);
        assert_eq!(store[child].value, 'a');
        assert_eq!(store[child].parent, Some(root));
    }

    #[test]
    fn test_root_sentinel_shape() {
        let root = CharNode::root_sentinel();
        assert!(root.is_root());
        assert!(!root.is_present);
        assert_eq!(root.b_count, 0);
        assert!(root.id.is_root());
    }

    #[test]
    fn test_new_node_counts_itself() {
        let node = CharNode::new(UniqueId::new(1, 1), 'x', NodeRef(0), Side::Left);
        assert!(node.is_present);
        assert_eq!(node.b_count, 1);
        assert_eq!(node.b_factor, 0);
    }

    #[test]
    fn test_side_accessors() {
        let mut node = CharNode::new(UniqueId::new(1, 1), 'x', NodeRef(0), Side::Left);
        node.children_mut(Side::Left).push(NodeRef(7));
        assert_eq!(node.children(Side::Left), &[NodeRef(7)]);
        assert!(node.children(Side::Right).is_empty());

        node.spine_mut(Side::Right).height = 3;
        assert_eq!(node.spine(Side::Right).height, 3);
        assert_eq!(node.spine(Side::Left).height, 0);
    }
}
