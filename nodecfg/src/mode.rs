//! Capability model of an NCM instance.
//!
//! Which operations an instance may perform is decided by its
//! [`OperationMode`]: every instance observes published configurations, but
//! only proposers may submit updates and only tooling may overwrite the
//! store.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use crate::nodes_config::NodeRole;

/// Capability bitset of an NCM instance.
///
/// The set must satisfy: not both `Client` and `Coordinator`, and at least
/// one of `Client`, `Tooling`, `StorageMember`, `Sequencer`. `Proposer` is a
/// strict add-on obtained by [`upgrade`](SharedOperationMode::upgrade_to_proposer)
/// and never revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationMode(u8);

impl OperationMode {
    const CLIENT: u8 = 1 << 0;
    const TOOLING: u8 = 1 << 1;
    const STORAGE_MEMBER: u8 = 1 << 2;
    const SEQUENCER: u8 = 1 << 3;
    const PROPOSER: u8 = 1 << 4;
    const COORDINATOR: u8 = 1 << 5;

    pub fn for_client() -> Self {
        let mode = OperationMode(Self::CLIENT);
        debug_assert!(mode.is_valid());
        mode
    }

    /// Emergency/oncall tooling is allowed to make changes to the nodes
    /// configuration, so it is a proposer from the start.
    pub fn for_tooling() -> Self {
        let mode = OperationMode(Self::TOOLING | Self::PROPOSER);
        debug_assert!(mode.is_valid());
        mode
    }

    /// Mode of a server node with the given roles. Storage nodes and
    /// sequencers may get upgraded to proposers later, but they start out as
    /// observers.
    pub fn for_node_roles(roles: &BTreeSet<NodeRole>) -> Self {
        let mut flags = 0;
        if roles.contains(&NodeRole::Sequencer) {
            flags |= Self::SEQUENCER;
        }
        if roles.contains(&NodeRole::Storage) {
            flags |= Self::STORAGE_MEMBER;
        }
        let mode = OperationMode(flags);
        debug_assert!(roles.is_empty() || mode.is_valid());
        mode
    }

    pub fn is_client(&self) -> bool {
        self.has_flags(Self::CLIENT)
    }

    /// True only when the mode is exactly `{Client}`.
    pub fn is_client_only(&self) -> bool {
        self.0 == Self::CLIENT
    }

    pub fn is_tooling(&self) -> bool {
        self.has_flags(Self::TOOLING)
    }

    pub fn is_storage_member(&self) -> bool {
        self.has_flags(Self::STORAGE_MEMBER)
    }

    pub fn is_sequencer(&self) -> bool {
        self.has_flags(Self::SEQUENCER)
    }

    pub fn is_proposer(&self) -> bool {
        self.has_flags(Self::PROPOSER)
    }

    pub fn is_coordinator(&self) -> bool {
        self.has_flags(Self::COORDINATOR)
    }

    pub fn is_valid(&self) -> bool {
        if self.is_client() && self.is_coordinator() {
            return false;
        }
        if !self.is_client() && !self.is_tooling() && !self.is_storage_member() && !self.is_sequencer() {
            return false;
        }
        true
    }

    fn has_flags(&self, flags: u8) -> bool {
        self.0 & flags != 0
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in [
            (Self::CLIENT, "client"),
            (Self::TOOLING, "tooling"),
            (Self::STORAGE_MEMBER, "storage"),
            (Self::SEQUENCER, "sequencer"),
            (Self::PROPOSER, "proposer"),
            (Self::COORDINATOR, "coordinator"),
        ] {
            if self.has_flags(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "observer")?;
        }
        Ok(())
    }
}

/// Mode cell shared between caller threads and the NCM task.
///
/// The only mutation is the one-way proposer upgrade, published with release
/// ordering. Loads gate user-facing error codes that are re-checked on the
/// NCM task, so acquire is plenty.
#[derive(Debug)]
pub struct SharedOperationMode(AtomicU8);

impl SharedOperationMode {
    pub fn new(mode: OperationMode) -> Self {
        SharedOperationMode(AtomicU8::new(mode.0))
    }

    pub fn load(&self) -> OperationMode {
        OperationMode(self.0.load(Ordering::Acquire))
    }

    /// OR in the proposer capability. Never revoked.
    pub fn upgrade_to_proposer(&self) {
        self.0.fetch_or(OperationMode::PROPOSER, Ordering::AcqRel);
    }
}
