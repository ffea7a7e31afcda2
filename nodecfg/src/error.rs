//! Error types exposed by this crate.

use std::sync::Arc;

use crate::codec::CodecError;
use crate::nodes_config::ConfigVersion;
use crate::nodes_config::NodesConfig;
use crate::nodes_config::ShardId;
use crate::nodes_config::StorageState;
use crate::store::StoreError;

/// The NCM task is no longer running.
///
/// Returned when a caller races with shutdown, or when the core task died.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fatal {
    #[error("NCM stopped")]
    Stopped,

    #[error("NCM panicked")]
    Panicked,
}

/// Why applying a [`ConfigUpdate`](crate::nodes_config::ConfigUpdate) to a
/// configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateRejected {
    #[error("node N{0} already exists")]
    NodeExists(u64),

    #[error("node N{0} is not in the configuration")]
    NodeNotFound(u64),

    #[error("shard {0} is not in the configuration")]
    ShardNotFound(ShardId),

    #[error("shard {shard} is in state {actual}, expected {expected}")]
    StaleShardState {
        shard: ShardId,
        expected: StorageState,
        actual: StorageState,
    },
}

/// Error returned by [`NodesConfigManager::update`].
///
/// [`NodesConfigManager::update`]: crate::manager::NodesConfigManager::update
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpdateError {
    /// Shutdown has been signalled; no further updates are accepted.
    #[error("NCM is shutting down")]
    Shutdown,

    /// This instance is not a proposer.
    #[error("operation mode does not permit proposing updates")]
    Access,

    /// One of the updates did not apply to the base configuration.
    #[error(transparent)]
    Rejected(#[from] UpdateRejected),

    /// The new configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialization(#[source] CodecError),

    /// The store's current version did not match the CAS base version.
    ///
    /// `stored` carries the store's current configuration when it was
    /// returned and could be decoded; the local pipeline has already been fed
    /// with it so the local view converges.
    #[error("version mismatch: store holds version {stored_version}")]
    VersionMismatch {
        stored_version: ConfigVersion,
        stored: Option<Arc<NodesConfig>>,
    },

    /// Any other store-side failure, propagated as-is. Retrying is the
    /// caller's call.
    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Fatal(#[from] Fatal),
}

/// Error returned by [`NodesConfigManager::overwrite`].
///
/// [`NodesConfigManager::overwrite`]: crate::manager::NodesConfigManager::overwrite
#[derive(Debug, Clone, thiserror::Error)]
pub enum OverwriteError {
    #[error("NCM is shutting down")]
    Shutdown,

    /// This instance is not a tooling instance.
    #[error("operation mode does not permit overwriting the store")]
    Access,

    /// The supplied configuration is unusable (e.g. carries the empty
    /// version).
    #[error("invalid configuration supplied for overwrite")]
    InvalidParam,

    #[error("failed to serialize configuration: {0}")]
    Serialization(#[source] CodecError),

    #[error(transparent)]
    Store(StoreError),
}
