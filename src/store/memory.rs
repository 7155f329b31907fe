use crate::error::{Error, Result};
use crate::node_type::NodeId;
use crate::store::Store;
use std::collections::HashMap;

/// Store keeping every record in a HashMap.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    records: HashMap<NodeId, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Store for MemoryStore {
    fn load(&self, id: NodeId) -> Result<Vec<u8>> {
        match self.records.get(&id) {
            Some(data) => Ok(data.clone()),
            None => Err(Error::NotFound(id)),
        }
    }

    fn save(&mut self, id: NodeId, data: &[u8]) -> Result<()> {
        self.records.insert(id, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, id: NodeId) -> Result<()> {
        self.records.remove(&id);
        Ok(())
    }

    fn ids(&self) -> Result<Vec<NodeId>> {
        Ok(self.records.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_overwrites_and_delete_is_idempotent() {
        let mut store = MemoryStore::new();
        store.save(NodeId(1), &[1, 2]).unwrap();
        store.save(NodeId(1), &[3]).unwrap();
        assert_eq!(store.load(NodeId(1)).unwrap(), vec![3]);
        assert_eq!(store.len(), 1);

        store.delete(NodeId(1)).unwrap();
        store.delete(NodeId(1)).unwrap();
        assert!(matches!(store.load(NodeId(1)), Err(Error::NotFound(NodeId(1)))));
        assert!(store.is_empty());
    }
}
