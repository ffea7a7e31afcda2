//! Operational tracing of configuration publications.
//!
//! Every successful update or overwrite emits one [`TraceSample`] while the
//! NCM is not shutting down. The default [`LogTracer`] renders samples as
//! structured tracing events; deployments with a trace pipeline plug in
//! their own [`ConfigTracer`].

use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::nodes_config::NodesConfig;
use crate::utils::RateLimit;

/// Which operation produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    NcmUpdate,
    NcmOverwrite,
}

impl TraceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceSource::NcmUpdate => "ncm_update",
            TraceSource::NcmOverwrite => "ncm_overwrite",
        }
    }
}

/// One publication trace record.
pub struct TraceSample {
    /// Lazily generated description of the applied update. Generated only if
    /// the sample is actually rendered.
    pub nc_update_gen: Option<Box<dyn FnOnce() -> String + Send + 'static>>,

    /// The configuration that was published.
    pub published_nc: Option<Arc<NodesConfig>>,

    pub source: TraceSource,
}

pub trait ConfigTracer: Send + Sync + 'static {
    fn trace(&self, sample: TraceSample);
}

/// Tracer that emits samples as `tracing` events.
pub struct LogTracer {
    missing_nc_limit: RateLimit,
}

impl LogTracer {
    pub fn new() -> Self {
        LogTracer {
            missing_nc_limit: RateLimit::new(std::time::Duration::from_secs(10), 1),
        }
    }
}

impl Default for LogTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigTracer for LogTracer {
    fn trace(&self, sample: TraceSample) {
        let sample_time_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default();

        let Some(nc) = sample.published_nc else {
            if self.missing_nc_limit.check() {
                tracing::error!(source = sample.source.as_str(), "published NC is missing from trace sample");
            }
            return;
        };

        let nc_update = sample.nc_update_gen.map(|gen| gen()).unwrap_or_default();
        tracing::info!(
            target: "nodes_config_trace",
            source = sample.source.as_str(),
            published_version = nc.version().val(),
            published_nc_ctime_ms = nc.last_change_at_ms(),
            sample_time_ms,
            %nc_update,
            "published nodes configuration"
        );
    }
}
