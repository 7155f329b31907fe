//! Configuration for a BTree instance.

use crate::error::{Error, Result};
use crate::page_layout::DEFAULT_MIN_DEGREE;

/// Minimum degree `T` of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Degree(usize);

impl Degree {
    pub fn new(min_degree: usize) -> Result<Degree> {
        if min_degree < 2 {
            return Err(Error::InvalidDegree(min_degree));
        }
        Ok(Degree(min_degree))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Fewest keys a non-root node may hold (T-1).
    pub fn min_keys(self) -> usize {
        self.0 - 1
    }

    /// Most keys any node may hold (2T-1).
    pub fn max_keys(self) -> usize {
        2 * self.0 - 1
    }
}

impl Default for Degree {
    fn default() -> Self {
        Degree(DEFAULT_MIN_DEGREE)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum degree of the tree (default: 10).
    pub min_degree: usize,

    /// Whether file-backed stores fsync every record they write.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_degree: DEFAULT_MIN_DEGREE,
            sync_writes: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_degree(mut self, min_degree: usize) -> Self {
        self.min_degree = min_degree;
        self
    }

    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    pub fn degree(&self) -> Result<Degree> {
        Degree::new(self.min_degree)
    }
}
