use crate::node_type::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No record is stored under the id.
    #[error("node {0} not found")]
    NotFound(NodeId),

    /// A record failed to decode.
    #[error("node {id} is corrupt: {reason}")]
    Corrupt { id: NodeId, reason: String },

    /// The underlying medium rejected a read, write or delete.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] std::io::Error),

    /// A structural check over the tree found a broken invariant.
    #[error("invariant violated at node {id}: {reason}")]
    InvariantViolation { id: NodeId, reason: String },

    /// A mutation failed after it may have persisted part of its changes.
    #[error("tree mutation failed part way through: {0}")]
    TreeCorruption(#[source] Box<Error>),

    /// An earlier mutation failed and the tree has not been revalidated since.
    #[error("tree is poisoned by a failed mutation; revalidate before writing")]
    Poisoned,

    #[error("node ids exhausted")]
    IdsExhausted,

    #[error("minimum degree must be at least 2, got {0}")]
    InvalidDegree(usize),
}

impl Error {
    pub fn corrupt(id: NodeId, reason: impl Into<String>) -> Error {
        Error::Corrupt {
            id,
            reason: reason.into(),
        }
    }

    pub fn invariant(id: NodeId, reason: impl Into<String>) -> Error {
        Error::InvariantViolation {
            id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_mean_the_store_is_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[test]
    fn display_names_the_node() {
        let err = Error::corrupt(NodeId(42), "truncated keys");
        assert_eq!(err.to_string(), "node 42 is corrupt: truncated keys");

        let err = Error::TreeCorruption(Box::new(Error::NotFound(NodeId(7))));
        assert!(err.to_string().contains("node 7 not found"));
    }
}
