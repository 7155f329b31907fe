use crate::error::Result;
use crate::node_type::NodeId;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keyed byte storage holding one record per node.
pub trait Store {
    /// Returns the record stored under `id`, or `Error::NotFound`.
    fn load(&self, id: NodeId) -> Result<Vec<u8>>;

    /// Stores `data` under `id`, replacing any previous record.
    fn save(&mut self, id: NodeId, data: &[u8]) -> Result<()>;

    /// Removes the record under `id`. Removing an absent record is not an error.
    fn delete(&mut self, id: NodeId) -> Result<()>;

    /// Lists the ids of every stored record, in no particular order.
    fn ids(&self) -> Result<Vec<NodeId>>;
}
