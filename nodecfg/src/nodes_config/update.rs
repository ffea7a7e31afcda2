use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::nodes_config::NodeState;
use crate::nodes_config::ShardId;
use crate::nodes_config::StorageState;

/// A single delta a proposer applies to a [`NodesConfig`].
///
/// Updates are applied in order; each successful application bumps the
/// configuration version by one.
///
/// [`NodesConfig`]: crate::nodes_config::NodesConfig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigUpdate {
    /// Add a node with the given initial state. Rejected if the node already
    /// exists.
    AddNode { node: u64, state: NodeState },

    /// Remove a node and all of its shards. Rejected if the node is absent.
    RemoveNode { node: u64 },

    /// Move one shard to `target`, conditional on its current state matching
    /// `expected`. The precondition rejects updates built against a
    /// configuration that has since moved on.
    SetShardState {
        shard: ShardId,
        expected: StorageState,
        target: StorageState,
    },

    /// Enable or disable sequencing on a node.
    SetSequencerEnabled { node: u64, enabled: bool },
}

impl fmt::Display for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigUpdate::AddNode { node, .. } => write!(f, "add(N{})", node),
            ConfigUpdate::RemoveNode { node } => write!(f, "remove(N{})", node),
            ConfigUpdate::SetShardState { shard, expected, target } => {
                write!(f, "shard({} {}->{})", shard, expected, target)
            }
            ConfigUpdate::SetSequencerEnabled { node, enabled } => {
                write!(f, "seq(N{} {})", node, if *enabled { "on" } else { "off" })
            }
        }
    }
}
