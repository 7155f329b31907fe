//! A disk-resident B-Tree of `i32` keys.
//!
//! Each node lives in its own record, addressed by a [`NodeId`]. Records are
//! moved in and out of a [`Store`] by the [`Pager`], and [`BTree`] tracks the
//! root while nodes split, merge and rotate keys to keep the tree balanced.

pub mod btree;
pub mod config;
pub mod error;
pub mod node;
pub mod node_type;
pub mod page;
pub mod page_layout;
pub mod pager;
pub mod store;

pub use crate::btree::{BTree, TreeStats};
pub use crate::config::{Config, Degree};
pub use crate::error::{Error, Result};
pub use crate::node::{Node, Slot};
pub use crate::node_type::{Key, NodeId, NodeType};
pub use crate::pager::{IdAllocator, Pager, SequentialIds};
pub use crate::store::{FileStore, MemoryStore, Store};
