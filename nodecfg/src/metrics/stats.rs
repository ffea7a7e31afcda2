use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Monotonic counters shared between the public handle and the core task.
///
/// The handle bumps request counters before posting to the core; the core
/// folds a snapshot into every published [`NcmMetrics`](super::NcmMetrics).
#[derive(Debug, Default)]
pub(crate) struct NcmStats {
    pub(crate) updates_requested: AtomicU64,
    pub(crate) overwrites_requested: AtomicU64,
    pub(crate) config_received: AtomicU64,
    pub(crate) serialization_errors: AtomicU64,
    pub(crate) config_published: AtomicU64,
    pub(crate) advance_failures: AtomicU64,
}

impl NcmStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
