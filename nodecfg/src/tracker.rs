//! Tracks shards sitting in intermediary storage states.
//!
//! The tracker observes every staged configuration and remembers when each
//! shard was first seen in its current intermediary state. A proposer
//! periodically asks it for a batched update that forces shards onward once
//! they have been stuck past the configured timeout.
//!
//! The tracker only ever derives its view from configurations that were
//! actually staged; it never predicts a transition.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::nodes_config::ConfigUpdate;
use crate::nodes_config::NodesConfig;
use crate::nodes_config::ShardId;
use crate::nodes_config::StorageState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedShard {
    state: StorageState,
    entered_at: SystemTime,
}

/// Per-shard record of intermediary states and when they were entered.
#[derive(Debug, Default)]
pub struct ShardStateTracker {
    // BTreeMap so extracted updates are reproducible: equal timestamps
    // tie-break in shard id order.
    entries: BTreeMap<ShardId, TrackedShard>,
}

impl ShardStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the tracked set against a newly staged configuration.
    ///
    /// Shards newly seen in an intermediary state are stamped with the
    /// current time. A shard that stays in the same intermediary state keeps
    /// its original timestamp; entering a different intermediary state
    /// restarts the clock. Shards that left their intermediary state (or the
    /// configuration) are dropped.
    pub fn on_new_config(&mut self, nc: &NodesConfig) {
        self.reconcile(nc, SystemTime::now());
    }

    pub(crate) fn reconcile(&mut self, nc: &NodesConfig, now: SystemTime) {
        let mut next = BTreeMap::new();
        for (shard, state) in nc.shards() {
            if !state.is_intermediary() {
                continue;
            }
            let entered_at = match self.entries.get(&shard) {
                Some(e) if e.state == state => e.entered_at,
                _ => now,
            };
            next.insert(shard, TrackedShard { state, entered_at });
        }
        self.entries = next;
    }

    /// One batched update advancing every shard that entered its state at or
    /// before `till`. `None` when no shard qualifies.
    pub fn extract_nc_update(&self, till: SystemTime) -> Option<Vec<ConfigUpdate>> {
        let updates: Vec<ConfigUpdate> = self
            .entries
            .iter()
            .filter(|(_, e)| e.entered_at <= till)
            .filter_map(|(shard, e)| {
                e.state.advance_target().map(|target| ConfigUpdate::SetShardState {
                    shard: *shard,
                    expected: e.state,
                    target,
                })
            })
            .collect();

        if updates.is_empty() {
            None
        } else {
            Some(updates)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
