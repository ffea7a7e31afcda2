use std::fmt;

use crate::nodes_config::ConfigVersion;

/// A snapshot of the observable state of an NCM instance.
///
/// Versions are high-water marks: `staged_version` is the highest version
/// ever staged, not the version currently sitting in the staged slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NcmMetrics {
    /// The instance has been initialized and its heartbeat is running.
    pub started: bool,

    /// At least one configuration has completed the publish pipeline.
    pub initialized: bool,

    pub staged_version: ConfigVersion,
    pub pending_version: ConfigVersion,
    pub published_version: ConfigVersion,

    pub updates_requested: u64,
    pub overwrites_requested: u64,
    pub config_received: u64,
    pub serialization_errors: u64,
    pub config_published: u64,

    /// Failed attempts to advance intermediary shard states.
    pub advance_failures: u64,
}

impl NcmMetrics {
    pub fn new_initial() -> Self {
        Self::default()
    }
}

impl fmt::Display for NcmMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NcmMetrics{{started:{}, initialized:{}, staged:{}, pending:{}, published:{}, \
             received:{}, published_cnt:{}, ser_errors:{}, updates_req:{}, overwrites_req:{}, \
             advance_failures:{}}}",
            self.started,
            self.initialized,
            self.staged_version,
            self.pending_version,
            self.published_version,
            self.config_received,
            self.config_published,
            self.serialization_errors,
            self.updates_requested,
            self.overwrites_requested,
            self.advance_failures,
        )
    }
}
