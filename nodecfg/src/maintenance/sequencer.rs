use crate::maintenance::MaintenanceStatus;
use crate::maintenance::SequencingState;

/// A state machine that tracks sequencing-state transitions of a single
/// node.
///
/// Plain owned data: moving a workflow moves all of its state.
#[derive(Debug)]
pub struct SequencerWorkflow {
    /// The node this workflow is for.
    node: u64,

    target_op_state: SequencingState,

    /// Sequencing state as of the configuration last passed to
    /// [`run`](Self::run).
    current_sequencing_state: SequencingState,

    /// If true, skip the safety check for this workflow.
    skip_safety_check: bool,
}

impl SequencerWorkflow {
    pub fn new(node: u64) -> Self {
        SequencerWorkflow {
            node,
            target_op_state: SequencingState::Enabled,
            current_sequencing_state: SequencingState::Unknown,
            skip_safety_check: false,
        }
    }

    pub fn node(&self) -> u64 {
        self.node
    }

    /// Set the target state. Only `Enabled` or `Disabled` are meaningful
    /// targets.
    pub fn set_target_op_state(&mut self, state: SequencingState) {
        debug_assert!(matches!(state, SequencingState::Enabled | SequencingState::Disabled));
        self.target_op_state = state;
    }

    pub fn target_op_state(&self) -> SequencingState {
        self.target_op_state
    }

    pub fn should_skip_safety_check(&mut self, skip: bool) {
        self.skip_safety_check = skip;
    }

    /// One step, driven with the node's sequencing state from the latest
    /// published configuration.
    pub async fn run(&mut self, is_sequencing_enabled: bool) -> MaintenanceStatus {
        self.current_sequencing_state = if is_sequencing_enabled {
            SequencingState::Enabled
        } else {
            SequencingState::Disabled
        };

        if self.current_sequencing_state == self.target_op_state {
            return MaintenanceStatus::Completed;
        }

        // Disabling a sequencer is subject to the safety check; enabling is
        // always safe.
        if self.target_op_state == SequencingState::Disabled && !self.skip_safety_check {
            return MaintenanceStatus::AwaitingSafetyCheck;
        }
        MaintenanceStatus::AwaitingNodesConfigChanges
    }
}
