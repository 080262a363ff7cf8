//! Shard identity
//!
//! A shard is addressed by its index and the total shard count. On the wire
//! this is the two element array `[index, count]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard index and total shard count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct ShardInfo {
    /// Zero-based shard index
    pub id: u32,
    /// Total number of shards
    pub count: u32,
}

impl ShardInfo {
    #[must_use]
    pub const fn new(id: u32, count: u32) -> Self {
        Self { id, count }
    }

    /// Check that the index lies in `[0, count)`
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.id < self.count
    }
}

impl From<[u32; 2]> for ShardInfo {
    fn from([id, count]: [u32; 2]) -> Self {
        Self { id, count }
    }
}

impl From<ShardInfo> for [u32; 2] {
    fn from(info: ShardInfo) -> Self {
        [info.id, info.count]
    }
}

impl fmt::Display for ShardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.count)
    }
}
