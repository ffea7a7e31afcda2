//! The versioned cluster membership and topology snapshot.
//!
//! A [`NodesConfig`] is an immutable value: applying a [`ConfigUpdate`]
//! produces a new instance with the version bumped. The manager only ever
//! hands out `Arc<NodesConfig>` and never mutates a published one.

mod shard_state;
mod update;
mod version;


use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

pub use shard_state::ShardId;
pub use shard_state::StorageState;
pub use update::ConfigUpdate;
pub use version::ConfigVersion;

use crate::error::UpdateRejected;

/// Roles a node announces in its service discovery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeRole {
    Sequencer,
    Storage,
}

/// Per-node membership state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Whether this node may run sequencers.
    pub sequencer_enabled: bool,

    /// Storage state of each shard the node carries.
    pub shards: BTreeMap<u32, StorageState>,
}

/// An immutable, versioned snapshot of cluster membership and topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesConfig {
    version: ConfigVersion,
    nodes: BTreeMap<u64, NodeState>,
    last_change_at_ms: u64,
}

impl NodesConfig {
    /// An empty configuration with version [`ConfigVersion::EMPTY`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> ConfigVersion {
        self.version
    }

    /// Renumber this configuration.
    pub fn with_version(mut self, version: ConfigVersion) -> Self {
        self.version = version;
        self
    }

    pub fn nodes(&self) -> &BTreeMap<u64, NodeState> {
        &self.nodes
    }

    pub fn node(&self, node: u64) -> Option<&NodeState> {
        self.nodes.get(&node)
    }

    pub fn shard_state(&self, shard: ShardId) -> Option<StorageState> {
        self.nodes.get(&shard.node).and_then(|n| n.shards.get(&shard.shard)).copied()
    }

    pub fn is_sequencing_enabled(&self, node: u64) -> bool {
        self.nodes.get(&node).map(|n| n.sequencer_enabled).unwrap_or(false)
    }

    /// All shards of all nodes, in `ShardId` order.
    pub fn shards(&self) -> impl Iterator<Item = (ShardId, StorageState)> + '_ {
        self.nodes.iter().flat_map(|(node, state)| {
            state.shards.iter().map(move |(shard, s)| (ShardId::new(*node, *shard), *s))
        })
    }

    /// Wall-clock time of the last applied change, in milliseconds since the
    /// Unix epoch.
    pub fn last_change_at_ms(&self) -> u64 {
        self.last_change_at_ms
    }

    /// Apply one update, producing a new configuration with `version.succ()`.
    pub fn apply_update(&self, update: &ConfigUpdate) -> Result<NodesConfig, UpdateRejected> {
        let mut next = self.clone();
        match update {
            ConfigUpdate::AddNode { node, state } => {
                if next.nodes.contains_key(node) {
                    return Err(UpdateRejected::NodeExists(*node));
                }
                next.nodes.insert(*node, state.clone());
            }
            ConfigUpdate::RemoveNode { node } => {
                if next.nodes.remove(node).is_none() {
                    return Err(UpdateRejected::NodeNotFound(*node));
                }
            }
            ConfigUpdate::SetShardState { shard, expected, target } => {
                let node_state =
                    next.nodes.get_mut(&shard.node).ok_or(UpdateRejected::NodeNotFound(shard.node))?;
                let current =
                    node_state.shards.get_mut(&shard.shard).ok_or(UpdateRejected::ShardNotFound(*shard))?;
                if *current != *expected {
                    return Err(UpdateRejected::StaleShardState {
                        shard: *shard,
                        expected: *expected,
                        actual: *current,
                    });
                }
                *current = *target;
            }
            ConfigUpdate::SetSequencerEnabled { node, enabled } => {
                let node_state = next.nodes.get_mut(node).ok_or(UpdateRejected::NodeNotFound(*node))?;
                node_state.sequencer_enabled = *enabled;
            }
        }
        next.version = self.version.succ();
        next.last_change_at_ms = now_ms();
        Ok(next)
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default()
}
