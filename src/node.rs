//! The unit of persistence: one trie node, one store record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a node record. Also the store key, see [`crate::encoding::id_key`].
pub type NodeId = u32;

/// The root always lives under id 0; allocated ids start at 1.
pub const ROOT_ID: NodeId = 0;

/// A trie node as stored in the record store.
///
/// `path` is redundant with the edge labels on the way down from the root. It
/// is kept on every node so exact-match checks and split arithmetic never have
/// to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub path: Vec<u8>,
    #[serde(default)]
    pub edge_label: Vec<u8>,
    #[serde(default)]
    pub values: Vec<String>,
    /// First byte of a child's edge label -> child id.
    #[serde(default)]
    pub children: BTreeMap<u8, NodeId>,
    /// Informational only. Descendants of a split's left node keep pointing
    /// at the mid node, so inserts resolve parents from the descent instead.
    #[serde(default)]
    pub parent_id: NodeId,
    /// Allocator high-water mark. Only the root carries one.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub watermark: NodeId,
}

fn is_zero(v: &NodeId) -> bool {
    *v == 0
}

impl Node {
    /// An empty root record.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID,
            path: Vec::new(),
            edge_label: Vec::new(),
            values: Vec::new(),
            children: BTreeMap::new(),
            parent_id: ROOT_ID,
            watermark: 0,
        }
    }

    /// A childless node holding a single value.
    pub fn leaf(id: NodeId, parent_id: NodeId, edge_label: &[u8], path: &[u8], value: String) -> Self {
        Self {
            id,
            path: path.to_vec(),
            edge_label: edge_label.to_vec(),
            values: vec![value],
            children: BTreeMap::new(),
            parent_id,
            watermark: 0,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Id of the child whose edge label starts with `byte`.
    #[inline]
    pub fn child(&self, byte: u8) -> Option<NodeId> {
        self.children.get(&byte).copied()
    }

    /// Hang `child` under this node, keyed by the first byte of its edge label.
    ///
    /// Returns the id previously registered under that byte, if any.
    pub fn link(&mut self, child: &Node) -> Option<NodeId> {
        debug_assert!(!child.edge_label.is_empty(), "non-root edge labels are never empty");
        self.children.insert(child.edge_label[0], child.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_shape() {
        let root = Node::root();
        assert!(root.is_root());
        assert!(root.is_leaf());
        assert!(root.path.is_empty());
        assert!(root.edge_label.is_empty());
    }

    #[test]
    fn test_link_replaces_same_first_byte() {
        let mut parent = Node::root();
        let a = Node::leaf(1, ROOT_ID, b"abc", b"abc", "1".into());
        let b = Node::leaf(2, ROOT_ID, b"ab", b"ab", "2".into());
        assert_eq!(parent.link(&a), None);
        assert_eq!(parent.link(&b), Some(1));
        assert_eq!(parent.child(b'a'), Some(2));
        assert_eq!(parent.children.len(), 1);
    }
}
