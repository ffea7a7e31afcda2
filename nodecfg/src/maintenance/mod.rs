//! Downstream maintenance consumers.
//!
//! Maintenance workflows live outside the NCM: they read published
//! configurations (through [`NodesConfigManager::get_config`] or the worker
//! slot) and, when they decide a transition is due, act as proposers. Each
//! workflow is a small per-node state machine driven by its owner every time
//! a new configuration is published.
//!
//! [`NodesConfigManager::get_config`]: crate::manager::NodesConfigManager::get_config

mod sequencer;


pub use sequencer::SequencerWorkflow;

/// Outcome reported by one step of a maintenance workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStatus {
    /// The target state is reached; nothing left to do.
    Completed,

    /// A configuration change has been (or must be) proposed; wait for it to
    /// be published.
    AwaitingNodesConfigChanges,

    /// The transition needs a safety-checker verdict first.
    AwaitingSafetyCheck,
}

/// Whether a node runs sequencers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencingState {
    Enabled,
    Disabled,
    /// Not yet observed from a published configuration.
    Unknown,
}
