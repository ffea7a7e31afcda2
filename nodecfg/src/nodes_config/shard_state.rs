use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Storage membership state of a single shard.
///
/// The `*To*` states and `DataMigration` are intermediary: a shard is only
/// supposed to pass through them while a transition is in progress. A shard
/// that stays in an intermediary state for too long is forced onward by a
/// proposer, see [`ShardStateTracker`](crate::tracker::ShardStateTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageState {
    /// The shard stores nothing and serves nothing.
    None,
    /// Becoming readable: replicas are being provisioned.
    NoneToReadOnly,
    /// The shard serves reads but accepts no new writes.
    ReadOnly,
    /// Fully serving.
    ReadWrite,
    /// Draining writes before becoming read-only.
    ReadWriteToReadOnly,
    /// Existing data is being migrated away before removal.
    DataMigration,
}

impl StorageState {
    /// Whether this is a transitional state that must age out.
    pub fn is_intermediary(&self) -> bool {
        matches!(
            self,
            StorageState::NoneToReadOnly | StorageState::ReadWriteToReadOnly | StorageState::DataMigration
        )
    }

    /// The state an intermediary shard advances to when forced onward.
    ///
    /// Returns `None` for settled states.
    pub fn advance_target(&self) -> Option<StorageState> {
        match self {
            StorageState::NoneToReadOnly => Some(StorageState::ReadOnly),
            StorageState::ReadWriteToReadOnly => Some(StorageState::ReadOnly),
            StorageState::DataMigration => Some(StorageState::None),
            _ => None,
        }
    }
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageState::None => "none",
            StorageState::NoneToReadOnly => "none-to-ro",
            StorageState::ReadOnly => "ro",
            StorageState::ReadWrite => "rw",
            StorageState::ReadWriteToReadOnly => "rw-to-ro",
            StorageState::DataMigration => "data-migration",
        };
        write!(f, "{}", s)
    }
}

/// Identifies one shard of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShardId {
    pub node: u64,
    pub shard: u32,
}

impl ShardId {
    pub fn new(node: u64, shard: u32) -> Self {
        ShardId { node, shard }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}:S{}", self.node, self.shard)
    }
}
