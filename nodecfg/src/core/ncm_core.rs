use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;

use crate::codec::ConfigCodec;
use crate::config::Config;
use crate::core::NcmMsg;
use crate::core::ResultSender;
use crate::error::UpdateError;
use crate::metrics::NcmMetrics;
use crate::metrics::NcmStats;
use crate::mode::SharedOperationMode;
use crate::nodes_config::ConfigUpdate;
use crate::nodes_config::ConfigVersion;
use crate::nodes_config::NodesConfig;
use crate::store::CasError;
use crate::store::ConfigStore;
use crate::tracer::ConfigTracer;
use crate::tracer::TraceSample;
use crate::tracer::TraceSource;
use crate::tracker::ShardStateTracker;
use crate::type_config::NcmTypeConfig;
use crate::utils::RateLimit;
use crate::workers::WorkerPool;

/// The version-wise larger of two optional configurations.
fn max_by_version<'a>(
    lhs: Option<&'a Arc<NodesConfig>>,
    rhs: Option<&'a Arc<NodesConfig>>,
) -> Option<&'a Arc<NodesConfig>> {
    match (lhs, rhs) {
        (None, rhs) => rhs,
        (lhs, None) => lhs,
        (Some(l), Some(r)) => {
            if l.version() > r.version() {
                Some(l)
            } else {
                Some(r)
            }
        }
    }
}

/// The NCM state machine.
///
/// Owns the staged/pending/published pipeline and the shard-state tracker.
/// Runs as a single task; every mutation happens here, posted in as an
/// [`NcmMsg`]. The pipeline for one observed version:
///
/// ```text
/// observed -> staged -> pending (fanned out to workers) -> published
/// ```
///
/// Stale or duplicate observations are dropped before deserialization when
/// possible.
pub(crate) struct NcmCore<C>
where C: NcmTypeConfig
{
    pub(crate) config: Arc<Config>,
    pub(crate) mode: Arc<SharedOperationMode>,
    pub(crate) store: Arc<C::Store>,
    pub(crate) workers: Arc<C::Workers>,
    pub(crate) tracer: Arc<C::Tracer>,
    pub(crate) stats: Arc<NcmStats>,
    pub(crate) shutdown_signaled: Arc<AtomicBool>,

    /// Last fully published configuration; the only slot visible outside
    /// this task (through `tx_local`).
    pub(crate) local_nc: Option<Arc<NodesConfig>>,

    /// Newest observation awaiting processing.
    pub(crate) staged_nc: Option<Arc<NodesConfig>>,

    /// The configuration currently being fanned out to workers. Non-empty
    /// iff a publication is in flight.
    pub(crate) pending_nc: Option<Arc<NodesConfig>>,

    pub(crate) tracker: ShardStateTracker,

    pub(crate) started: bool,
    pub(crate) initialized: bool,

    /// High-water marks for the metrics gauges.
    pub(crate) staged_version: ConfigVersion,
    pub(crate) pending_version: ConfigVersion,

    pub(crate) tx_api: mpsc::UnboundedSender<NcmMsg>,
    pub(crate) rx_api: mpsc::UnboundedReceiver<NcmMsg>,

    pub(crate) tx_local: watch::Sender<Option<Arc<NodesConfig>>>,
    pub(crate) tx_worker_nc: watch::Sender<Option<Arc<NodesConfig>>>,
    pub(crate) tx_metrics: watch::Sender<NcmMetrics>,

    pub(crate) advance_err_limit: Arc<RateLimit>,
}

impl<C> NcmCore<C>
where C: NcmTypeConfig
{
    pub(crate) async fn main(mut self, mut rx_shutdown: oneshot::Receiver<()>) {
        tracing::debug!(cluster = %self.config.cluster_name, "NCM core task running");

        loop {
            tokio::select! {
                msg = self.rx_api.recv() => {
                    match msg {
                        Some(msg) => self.handle_msg(msg),
                        None => break,
                    }
                }

                _ = &mut rx_shutdown => break,
            }

            self.flush_metrics();
        }

        tracing::info!("NCM core task stopped");
    }

    fn handle_msg(&mut self, msg: NcmMsg) {
        tracing::trace!(msg = %msg, "NCM message");
        match msg {
            NcmMsg::Init { nc } => self.init_on_ncm(nc),
            NcmMsg::NewConfig { bytes } => self.on_new_config(bytes),
            NcmMsg::NewConfigParsed { nc } => self.on_new_config_parsed(nc),
            NcmMsg::ProcessingFinished { nc } => self.on_processing_finished(nc),
            NcmMsg::Update { updates, tx } => self.on_update_request(updates, tx),
            NcmMsg::GetLatestKnown { tx } => {
                let _ = tx.send(self.latest_known_config());
            }
            NcmMsg::Tick => self.on_heartbeat(),
        }
    }

    fn shutdown_signaled(&self) -> bool {
        self.shutdown_signaled.load(Ordering::Acquire)
    }

    fn init_on_ncm(&mut self, init_nc: Arc<NodesConfig>) {
        if self.shutdown_signaled() {
            return;
        }
        self.started = true;

        // Start polling from the store right away instead of waiting out the
        // first tick interval.
        self.on_heartbeat();

        self.on_new_config_parsed(init_nc);
    }

    /// Byte-level observation entry point.
    fn on_new_config(&mut self, bytes: Vec<u8>) {
        NcmStats::incr(&self.stats.config_received);
        if self.shutdown_signaled() {
            return;
        }

        let new_version = match C::Codec::extract_config_version(&bytes) {
            Ok(v) => v,
            Err(e) => {
                // Invalid serialized blob.
                NcmStats::incr(&self.stats.serialization_errors);
                tracing::info!(error = %e, "received a config blob with an unreadable version");
                return;
            }
        };
        if self.has_processed_version(new_version) {
            // Early return to avoid deserialization.
            return;
        }

        let parsed = match C::Codec::deserialize(&bytes) {
            Ok(nc) => nc,
            Err(e) => {
                NcmStats::incr(&self.stats.serialization_errors);
                tracing::info!(version = new_version.val(), error = %e, "failed to deserialize received config");
                return;
            }
        };
        self.report_propagation_latency(&parsed);
        self.on_new_config_parsed(Arc::new(parsed));
    }

    /// Observation entry point for already deserialized configurations.
    fn on_new_config_parsed(&mut self, new_config: Arc<NodesConfig>) {
        if self.shutdown_signaled() {
            return;
        }

        // All accesses to the staged and pending slots happen on this task;
        // no synchronization needed.
        let new_version = new_config.version();
        if !self.should_stage_version(new_version) {
            return;
        }
        tracing::debug!(version = new_version.val(), "staging nodes configuration");

        self.tracker.on_new_config(&new_config);
        self.staged_nc = Some(new_config);
        self.staged_version = new_version;

        self.advance_intermediary_shard_states();
        self.maybe_process_staged_config();
    }

    fn should_stage_version(&self, version: ConfigVersion) -> bool {
        self.staged_nc.as_ref().map(|s| s.version() < version).unwrap_or(true)
            && !self.is_processing_equal_or_higher_version(version)
            && !self.has_processed_version(version)
    }

    fn is_processing_equal_or_higher_version(&self, version: ConfigVersion) -> bool {
        self.pending_nc.as_ref().map(|p| p.version() >= version).unwrap_or(false)
    }

    fn has_processed_version(&self, version: ConfigVersion) -> bool {
        self.local_nc.as_ref().map(|c| c.version() >= version).unwrap_or(false)
    }

    /// Version-wise max of the local, pending and staged configurations; an
    /// empty configuration when all slots are empty.
    fn latest_known_config(&self) -> Arc<NodesConfig> {
        let c = max_by_version(self.local_nc.as_ref(), self.pending_nc.as_ref());
        let c = max_by_version(c, self.staged_nc.as_ref());
        c.cloned().unwrap_or_else(|| Arc::new(NodesConfig::new()))
    }

    /// Move the staged configuration into the pending slot and fan it out,
    /// unless a publication is already in flight.
    fn maybe_process_staged_config(&mut self) {
        // nothing is staged or we're already processing a version
        if self.staged_nc.is_none() || self.pending_nc.is_some() {
            return;
        }
        let Some(pending) = self.staged_nc.take() else {
            return;
        };
        let version = pending.version();
        debug_assert!(!self.has_processed_version(version));
        tracing::debug!(version = version.val(), "processing staged nodes configuration");

        self.pending_nc = Some(pending.clone());
        self.pending_version = version;

        // Publish to the slot worker contexts read before fanning out, so
        // the notified handlers observe the version they are told about.
        let _ = self.tx_worker_nc.send(Some(pending.clone()));

        let workers = self.workers.clone();
        let tx_api = self.tx_api.clone();
        let shutdown = self.shutdown_signaled.clone();
        tokio::spawn(async move {
            // A stuck worker blocks newer configs from here on. Accepted:
            // every worker has to process every config anyway.
            workers.fulfill_on_all_workers(pending.clone()).await;

            // Completes on the slowest worker's context; hand the result
            // back to the NCM task if it is still around.
            tracing::debug!(version = pending.version().val(), "worker processing complete");
            if shutdown.load(Ordering::Acquire) {
                return;
            }
            let _ = tx_api.send(NcmMsg::ProcessingFinished { nc: pending });
        });
    }

    fn on_processing_finished(&mut self, new_config: Arc<NodesConfig>) {
        let new_version = new_config.version();
        let Some(pending) = self.pending_nc.take() else {
            panic!("processing finished for version {} with no pending configuration", new_version);
        };
        assert_eq!(
            pending.version(),
            new_version,
            "processing finished for a version other than the pending one"
        );
        assert!(!self.has_processed_version(new_version));

        // Only this task updates the local config.
        self.local_nc = Some(pending.clone());
        let _ = self.tx_local.send(Some(pending));
        self.initialized = true;
        NcmStats::incr(&self.stats.config_published);
        tracing::info!(version = new_version.val(), "updated local nodes configuration");

        self.maybe_process_staged_config();
    }

    fn on_update_request(
        &mut self,
        updates: Vec<ConfigUpdate>,
        tx: ResultSender<Arc<NodesConfig>, UpdateError>,
    ) {
        // Re-check on the NCM task; the caller-side check is advisory.
        if !self.mode.load().is_proposer() {
            let _ = tx.send(Err(UpdateError::Access));
            return;
        }

        let base = self.latest_known_config();
        let base_version = base.version();

        let mut new_config = (*base).clone();
        for u in &updates {
            new_config = match new_config.apply_update(u) {
                Ok(nc) => nc,
                Err(rejected) => {
                    let _ = tx.send(Err(rejected.into()));
                    return;
                }
            };
        }
        // apply_update bumps the version each step. The protocol tolerates
        // gaps in the version numbers, but contiguous ones keep the CAS
        // simple.
        let new_config = Arc::new(new_config.with_version(base_version.succ()));

        let serialized = match C::Codec::serialize(&new_config) {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(Err(UpdateError::Serialization(e)));
                return;
            }
        };

        let store = self.store.clone();
        let tx_api = self.tx_api.clone();
        let shutdown = self.shutdown_signaled.clone();
        tokio::spawn(async move {
            // Runs on a store-owned context. Observations are posted back to
            // the NCM task, never applied from here.
            let res = store.update_config(serialized, base_version).await;

            let notify_ncm_of_new_config = |nc: Arc<NodesConfig>| {
                if shutdown.load(Ordering::Acquire) {
                    // NCM shut down, no need to notify it
                    return;
                }
                tracing::info!(version = nc.version().val(), "notifying NCM of new config");
                let _ = tx_api.send(NcmMsg::NewConfigParsed { nc });
            };

            match res {
                Ok(stored_version) => {
                    debug_assert_eq!(stored_version, new_config.version());
                    notify_ncm_of_new_config(new_config.clone());
                    let _ = tx.send(Ok(new_config));
                }
                Err(CasError::VersionMismatch { current, stored }) => {
                    // If we know which config prevented the update, feed it
                    // back so the local view converges.
                    let stored_nc = stored
                        .filter(|bytes| !current.is_empty() && !bytes.is_empty())
                        .and_then(|bytes| C::Codec::deserialize(&bytes).ok())
                        .map(Arc::new);
                    if let Some(nc) = &stored_nc {
                        notify_ncm_of_new_config(nc.clone());
                    }
                    let _ = tx.send(Err(UpdateError::VersionMismatch {
                        stored_version: current,
                        stored: stored_nc,
                    }));
                }
                Err(CasError::Store(e)) => {
                    let _ = tx.send(Err(UpdateError::Store(e)));
                }
            }
        });
    }

    fn on_heartbeat(&mut self) {
        if !self.started || self.shutdown_signaled() {
            return;
        }

        let consistent = self.should_do_consistent_config_fetch();
        let store = self.store.clone();
        let tx_api = self.tx_api.clone();
        tokio::spawn(async move {
            match store.read(consistent).await {
                Ok(Some(bytes)) => {
                    let _ = tx_api.send(NcmMsg::NewConfig { bytes });
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "heartbeat read from store failed"),
            }
        });

        self.advance_intermediary_shard_states();

        if self.config.server {
            self.check_and_report_consistency();
        }
    }

    fn should_do_consistent_config_fetch(&self) -> bool {
        self.mode.load().is_storage_member() && self.local_nc.is_none()
    }

    /// Propose transitions for shards stuck in intermediary states past the
    /// configured timeout. No-op unless this instance is a proposer.
    fn advance_intermediary_shard_states(&mut self) {
        if !self.mode.load().is_proposer() || self.shutdown_signaled() {
            return;
        }

        let till = SystemTime::now() - self.config.intermediary_timeout();
        let Some(updates) = self.tracker.extract_nc_update(till) else {
            return;
        };
        tracing::info!(
            shards = updates.len(),
            "proposing update to transition shards out of intermediary states"
        );

        NcmStats::incr(&self.stats.updates_requested);
        let desc = updates.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(", ");

        let (tx, rx) = oneshot::channel();
        self.on_update_request(updates, tx);

        let stats = self.stats.clone();
        let limit = self.advance_err_limit.clone();
        let tracer = self.tracer.clone();
        let shutdown = self.shutdown_signaled.clone();
        tokio::spawn(async move {
            let res = match rx.await {
                Ok(res) => res,
                Err(_) => return,
            };
            match res {
                Ok(nc) => {
                    if !shutdown.load(Ordering::Acquire) {
                        tracer.trace(TraceSample {
                            nc_update_gen: Some(Box::new(move || desc)),
                            published_nc: Some(nc),
                            source: TraceSource::NcmUpdate,
                        });
                    }
                }
                // Someone else advanced the shards first; that is just as
                // good.
                Err(UpdateError::VersionMismatch { .. }) => {}
                Err(err) => {
                    NcmStats::incr(&stats.advance_failures);
                    if limit.check() {
                        tracing::error!(error = %err, "attempt to advance intermediary shard states failed");
                    }
                }
            }
        });
    }

    /// Heartbeat telemetry for server instances.
    fn check_and_report_consistency(&self) {
        tracing::debug!(
            local = self.local_nc.as_ref().map(|c| c.version().val()).unwrap_or_default(),
            staged = self.staged_version.val(),
            pending = self.pending_version.val(),
            "nodes configuration consistency check"
        );
    }

    fn report_propagation_latency(&self, nc: &NodesConfig) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let delay_ms = now_ms.saturating_sub(nc.last_change_at_ms());
        tracing::debug!(version = nc.version().val(), delay_ms, "nodes configuration propagation delay");
    }

    fn flush_metrics(&self) {
        let m = NcmMetrics {
            started: self.started,
            initialized: self.initialized,
            staged_version: self.staged_version,
            pending_version: self.pending_version,
            published_version: self.local_nc.as_ref().map(|c| c.version()).unwrap_or_default(),
            updates_requested: NcmStats::get(&self.stats.updates_requested),
            overwrites_requested: NcmStats::get(&self.stats.overwrites_requested),
            config_received: NcmStats::get(&self.stats.config_received),
            serialization_errors: NcmStats::get(&self.stats.serialization_errors),
            config_published: NcmStats::get(&self.stats.config_published),
            advance_failures: NcmStats::get(&self.stats.advance_failures),
        };
        self.tx_metrics.send_if_modified(|cur| {
            if *cur == m {
                false
            } else {
                *cur = m;
                true
            }
        });
    }
}
