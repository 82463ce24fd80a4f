//! Core types for the STR-tree.
//!
//! Nodes live in a flat arena indexed by [`NodeId`] instead of owning their
//! children, which sidesteps ownership cycles and doubles as the persisted
//! layout: the builder appends levels bottom-up, so every child id is
//! smaller than its parent's id and the arena order is already the
//! children-before-parents order the index file wants.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Opaque reference to an indexed item in the external document store.
///
/// The index never interprets it beyond equality; resolving it to a
/// geometry is the document store's and kernel's business.
pub type ItemRef = u64;

/// Index of a node in the tree's arena.
pub type NodeId = u32;

/// One indexed item: its envelope and its reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub envelope: Envelope,
    pub item: ItemRef,
}

impl IndexEntry {
    pub fn new(envelope: Envelope, item: ItemRef) -> Self {
        Self { envelope, item }
    }
}

/// A node in the tree.
///
/// Invariant: a node's stored envelope equals the exact union of its
/// entries' (leaf) or children's (internal) envelopes. Queries rely on the
/// bounds being tight for correct pruning, so there is no slack anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding up to `branching_factor` entries.
    Leaf {
        envelope: Envelope,
        entries: Vec<IndexEntry>,
    },
    /// Internal node holding up to `branching_factor` child node ids.
    Internal {
        envelope: Envelope,
        children: Vec<NodeId>,
    },
}

impl TreeNode {
    /// The envelope enclosing everything below this node.
    pub fn envelope(&self) -> &Envelope {
        match self {
            TreeNode::Leaf { envelope, .. } => envelope,
            TreeNode::Internal { envelope, .. } => envelope,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Number of entries (leaf) or children (internal).
    pub fn len(&self) -> usize {
        match self {
            TreeNode::Leaf { entries, .. } => entries.len(),
            TreeNode::Internal { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A bulk-loaded, immutable STR-tree over a batch of index entries.
///
/// Built exactly once per construction call and never mutated afterwards,
/// so concurrent read-only traversals need no locking.
#[derive(Debug, Clone)]
pub struct StrTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    item_count: usize,
    branching_factor: usize,
}

impl StrTree {
    /// Assembles a tree from its parts. The arena must be in bottom-up
    /// construction order with the root as the last node.
    pub(crate) fn from_parts(
        nodes: Vec<TreeNode>,
        root: NodeId,
        item_count: usize,
        branching_factor: usize,
    ) -> Self {
        debug_assert_eq!(root as usize, nodes.len() - 1);
        Self {
            nodes,
            root,
            item_count,
            branching_factor,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub(crate) fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Number of indexed items.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    /// Height of the tree; a single-leaf tree has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut id = self.root;
        loop {
            match self.node(id) {
                TreeNode::Leaf { .. } => return height,
                TreeNode::Internal { children, .. } => {
                    height += 1;
                    id = children[0];
                }
            }
        }
    }

    /// Iterates over every indexed entry, leaf by leaf.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            TreeNode::Leaf { entries, .. } => Some(entries.iter()),
            TreeNode::Internal { .. } => None,
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_leaf_tree() {
        let entry = IndexEntry::new(Envelope::new(0.0, 0.0, 1.0, 1.0), 7);
        let leaf = TreeNode::Leaf {
            envelope: entry.envelope,
            entries: vec![entry],
        };
        let tree = StrTree::from_parts(vec![leaf], 0, 1, 10);

        assert_eq!(tree.item_count(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.height(), 1);
        assert!(tree.node(tree.root()).is_leaf());
        assert_eq!(tree.entries().count(), 1);
    }

    #[test]
    fn test_node_len() {
        let a = IndexEntry::new(Envelope::point(0.0, 0.0), 1);
        let b = IndexEntry::new(Envelope::point(1.0, 1.0), 2);
        let leaf = TreeNode::Leaf {
            envelope: a.envelope.union(&b.envelope),
            entries: vec![a, b],
        };
        assert_eq!(leaf.len(), 2);
        assert!(!leaf.is_empty());

        let internal = TreeNode::Internal {
            envelope: Envelope::new(0.0, 0.0, 1.0, 1.0),
            children: vec![0],
        };
        assert_eq!(internal.len(), 1);
        assert!(!internal.is_leaf());
    }
}
