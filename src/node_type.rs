use std::convert::{From, TryFrom};
use std::fmt;

/// Keys stored in the tree.
pub type Key = i32;

/// Stable identifier of a node record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// NodeType represents the two node kinds in the BTree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// Internal nodes hold separator keys and the ids of their children.
    Internal,

    /// Leaf nodes hold keys only.
    Leaf,
}

// Converts a leaf flag byte to a NodeType.
// The convention used throughout the record format is: one is a leaf, zero is internal.
impl TryFrom<u8> for NodeType {
    type Error = u8;

    fn try_from(orig: u8) -> Result<NodeType, u8> {
        match orig {
            0x00 => Ok(NodeType::Internal),
            0x01 => Ok(NodeType::Leaf),
            other => Err(other),
        }
    }
}

// Converts a NodeType to its leaf flag byte.
impl From<NodeType> for u8 {
    fn from(orig: NodeType) -> u8 {
        match orig {
            NodeType::Internal => 0x00,
            NodeType::Leaf => 0x01,
        }
    }
}
