use crate::config::Degree;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::node_type::{NodeId, NodeType};
use crate::page::Page;
use crate::store::Store;
use std::convert::TryFrom;
use tracing::trace;

/// Hands out node ids. An id is never handed out twice for the lifetime of a tree.
pub trait IdAllocator {
    fn next_id(&mut self) -> Result<NodeId>;
}

/// Allocates increasing ids starting from a given value.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: i64,
}

impl SequentialIds {
    pub fn starting_at(first: NodeId) -> SequentialIds {
        SequentialIds {
            next: i64::from(first.0),
        }
    }

    /// Continues after the largest of `used`, or starts at one when nothing is used.
    pub fn resume_after<I>(used: I) -> SequentialIds
    where
        I: IntoIterator<Item = NodeId>,
    {
        let next = match used.into_iter().max() {
            Some(NodeId(max)) => i64::from(max) + 1,
            None => 1,
        };
        SequentialIds { next: next.max(1) }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        SequentialIds::starting_at(NodeId(1))
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&mut self) -> Result<NodeId> {
        let id = i32::try_from(self.next).map_err(|_| Error::IdsExhausted)?;
        self.next += 1;
        Ok(NodeId(id))
    }
}

/// Pager moves nodes between memory and the store, one record per node.
/// Nothing is cached: every load goes to the store.
pub struct Pager<S, A = SequentialIds> {
    store: S,
    ids: A,
    degree: Degree,
}

impl<S: Store> Pager<S> {
    /// Creates a pager whose ids continue after every record already in `store`.
    pub fn new(store: S, degree: Degree) -> Result<Pager<S>> {
        let ids = SequentialIds::resume_after(store.ids()?);
        Ok(Pager::with_allocator(store, ids, degree))
    }
}

impl<S: Store, A: IdAllocator> Pager<S, A> {
    pub fn with_allocator(store: S, ids: A, degree: Degree) -> Pager<S, A> {
        Pager { store, ids, degree }
    }

    pub fn degree(&self) -> Degree {
        self.degree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load(&self, id: NodeId) -> Result<Node> {
        let page = Page::new(id, self.store.load(id)?);
        let node = Node::try_from(&page)?;
        trace!(id = %id, keys = node.keys().len(), leaf = node.is_leaf(), "loaded node");
        Ok(node)
    }

    pub fn save(&mut self, node: &Node) -> Result<()> {
        let page = Page::from(node);
        trace!(id = %node.id(), bytes = page.get_bytes().len(), "saving node");
        self.store.save(node.id(), page.get_bytes())
    }

    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        trace!(id = %id, "deleting node");
        self.store.delete(id)
    }

    /// Creates an empty node under a fresh id. The node is not persisted.
    pub fn allocate(&mut self, node_type: NodeType) -> Result<Node> {
        let id = self.ids.next_id()?;
        Ok(Node::new(id, node_type, self.degree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn pager() -> Pager<MemoryStore> {
        Pager::new(MemoryStore::new(), Degree::new(3).unwrap()).unwrap()
    }

    #[test]
    fn save_then_load() {
        let mut pager = pager();
        let mut node = pager.allocate(NodeType::Leaf).unwrap();
        node.keys.extend_from_slice(&[1, 2, 3]);
        pager.save(&node).unwrap();
        assert_eq!(pager.load(node.id()).unwrap(), node);

        pager.delete(node.id()).unwrap();
        assert!(matches!(pager.load(node.id()), Err(Error::NotFound(_))));
    }

    #[test]
    fn undecodable_record_is_corrupt() {
        let mut pager = pager();
        pager.store_mut().save(NodeId(5), &[1, 0, 0]).unwrap();
        assert!(matches!(pager.load(NodeId(5)), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn ids_resume_after_existing_records() {
        let mut store = MemoryStore::new();
        store.save(NodeId(3), &[]).unwrap();
        store.save(NodeId(11), &[]).unwrap();
        let mut pager = Pager::new(store, Degree::default()).unwrap();
        assert_eq!(pager.allocate(NodeType::Leaf).unwrap().id(), NodeId(12));
        assert_eq!(pager.allocate(NodeType::Internal).unwrap().id(), NodeId(13));
    }

    #[test]
    fn sequential_ids_never_wrap() {
        let mut ids = SequentialIds::starting_at(NodeId(i32::MAX));
        assert_eq!(ids.next_id().unwrap(), NodeId(i32::MAX));
        assert!(matches!(ids.next_id(), Err(Error::IdsExhausted)));

        let mut ids = SequentialIds::resume_after(vec![NodeId(i32::MAX)]);
        assert!(matches!(ids.next_id(), Err(Error::IdsExhausted)));
    }
}
