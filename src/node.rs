use crate::config::Degree;
use crate::error::{Error, Result};
use crate::node_type::{Key, NodeId, NodeType};

mod rebalance;

/// Where a key sits relative to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The key is stored at this position.
    Found(usize),
    /// The key is absent; it belongs in the child subtree at this position.
    Descend(usize),
}

/// A single BTree node as stored in one record.
///
/// A node is a leaf exactly when `children` is `None`. An internal node always
/// holds one more child id than it holds keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) keys: Vec<Key>,
    pub(crate) children: Option<Vec<NodeId>>,
}

impl Node {
    /// Creates an empty node, reserving room for a full node of the given degree.
    pub fn new(id: NodeId, node_type: NodeType, degree: Degree) -> Node {
        let children = match node_type {
            NodeType::Leaf => None,
            NodeType::Internal => Some(Vec::with_capacity(degree.max_keys() + 1)),
        };
        Node {
            id,
            keys: Vec::with_capacity(degree.max_keys()),
            children,
        }
    }

    /// Builds a node from already ordered parts.
    pub fn from_parts(id: NodeId, keys: Vec<Key>, children: Option<Vec<NodeId>>) -> Node {
        Node { id, keys, children }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn children(&self) -> Option<&[NodeId]> {
        self.children.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn node_type(&self) -> NodeType {
        if self.is_leaf() {
            NodeType::Leaf
        } else {
            NodeType::Internal
        }
    }

    /// One plus the number of keys: the number of child slots around the keys.
    pub fn size(&self) -> usize {
        self.keys.len() + 1
    }

    pub fn is_full(&self, degree: Degree) -> bool {
        self.size() == 2 * degree.get()
    }

    pub fn is_minimal(&self, degree: Degree) -> bool {
        self.size() == degree.get()
    }

    /// Turns this node into a leaf (dropping its children) or into an internal
    /// node with an empty child list.
    pub fn set_leaf(&mut self, leaf: bool) {
        if leaf {
            self.children = None;
        } else {
            self.children = Some(Vec::new());
        }
    }

    /// Finds `target` among this node's keys.
    pub fn locate(&self, target: Key) -> Slot {
        match self.keys.binary_search(&target) {
            Ok(pos) => Slot::Found(pos),
            Err(child) => Slot::Descend(child),
        }
    }

    pub(crate) fn child_id(&self, index: usize) -> Result<NodeId> {
        self.children
            .as_ref()
            .and_then(|children| children.get(index).copied())
            .ok_or_else(|| Error::corrupt(self.id, format!("no child at position {}", index)))
    }

    pub(crate) fn children_mut(&mut self) -> Result<&mut Vec<NodeId>> {
        let id = self.id;
        self.children
            .as_mut()
            .ok_or_else(|| Error::corrupt(id, "expected an internal node, found a leaf"))
    }
}
