//! Public NCM interface.
//!
//! [`NodesConfigManager`] is the handle to a running NCM instance. It is
//! cheaply cloneable; every component of the process that needs the current
//! cluster configuration shares one.

mod core_state;
mod manager_inner;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::sync::Mutex;
use tracing::Instrument;
use tracing::Level;

use crate::codec::ConfigCodec;
use crate::config::Config;
use crate::core::NcmCore;
use crate::core::NcmMsg;
use crate::core::Tick;
use crate::error::Fatal;
use crate::error::OverwriteError;
use crate::error::UpdateError;
use crate::manager::core_state::CoreState;
use crate::manager::manager_inner::NcmInner;
use crate::metrics::NcmMetrics;
use crate::metrics::NcmStats;
use crate::metrics::Wait;
use crate::mode::OperationMode;
use crate::mode::SharedOperationMode;
use crate::nodes_config::ConfigUpdate;
use crate::nodes_config::ConfigVersion;
use crate::nodes_config::NodesConfig;
use crate::store::ConfigStore;
use crate::tracer::ConfigTracer;
use crate::tracer::TraceSample;
use crate::tracer::TraceSource;
use crate::tracker::ShardStateTracker;
use crate::type_config::NcmTypeConfig;
use crate::utils::RateLimit;

/// Handle to a running NCM instance.
///
/// Spawns the core task on construction; [`init`](Self::init) seeds the
/// pipeline and starts heartbeating. All methods may be called from any
/// task. Updates and overwrites resolve exactly once, either with the
/// outcome reported by the store or with a shutdown/fatal error.
pub struct NodesConfigManager<C>
where C: NcmTypeConfig
{
    inner: Arc<NcmInner<C>>,
}

impl<C> Clone for NodesConfigManager<C>
where C: NcmTypeConfig
{
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<C> NodesConfigManager<C>
where C: NcmTypeConfig
{
    /// Create the manager and spawn its core task.
    ///
    /// `mode` declares the capabilities of this instance and must be valid;
    /// `store`, `workers` and `tracer` are the I/O collaborators selected
    /// through [`NcmTypeConfig`].
    pub fn new(
        mode: OperationMode,
        config: Arc<Config>,
        store: Arc<C::Store>,
        workers: Arc<C::Workers>,
        tracer: Arc<C::Tracer>,
    ) -> Self {
        debug_assert!(mode.is_valid(), "invalid operation mode: {}", mode);

        let (tx_api, rx_api) = mpsc::unbounded_channel();
        let (tx_metrics, rx_metrics) = watch::channel(NcmMetrics::new_initial());
        let (tx_local, rx_local) = watch::channel(None);
        let (tx_worker_nc, rx_worker_nc) = watch::channel(None);
        let (tx_shutdown, rx_shutdown) = oneshot::channel();

        let shutdown_signaled = Arc::new(AtomicBool::new(false));
        let mode = Arc::new(SharedOperationMode::new(mode));
        let stats = Arc::new(NcmStats::default());

        let tick_handle = Tick::spawn(config.heartbeat_period(), tx_api.clone(), config.enable_tick);

        let core: NcmCore<C> = NcmCore {
            config: config.clone(),
            mode: mode.clone(),
            store: store.clone(),
            workers,
            tracer: tracer.clone(),
            stats: stats.clone(),
            shutdown_signaled: shutdown_signaled.clone(),

            local_nc: None,
            staged_nc: None,
            pending_nc: None,
            tracker: ShardStateTracker::new(),

            started: false,
            initialized: false,
            staged_version: ConfigVersion::EMPTY,
            pending_version: ConfigVersion::EMPTY,

            tx_api: tx_api.clone(),
            rx_api,

            tx_local,
            tx_worker_nc,
            tx_metrics,

            advance_err_limit: Arc::new(RateLimit::new(Duration::from_secs(10), 5)),
        };

        let core_span = tracing::span!(Level::DEBUG, "NcmCore", cluster = %config.cluster_name);
        let core_handle = tokio::spawn(core.main(rx_shutdown).instrument(core_span));

        let inner = NcmInner {
            config,
            mode,
            stats,
            store,
            tracer,
            shutdown_signaled,
            tx_api,
            rx_metrics,
            rx_local,
            rx_worker_nc,
            tick_handle,
            tx_shutdown: Mutex::new(Some(tx_shutdown)),
            core_state: Mutex::new(CoreState::Running(core_handle)),
        };

        Self { inner: Arc::new(inner) }
    }

    /// Seed the pipeline with `initial` and start heartbeating.
    ///
    /// With `wait_until_initialized`, waits up to `Config::init_timeout` for
    /// the first configuration to complete the publish pipeline and returns
    /// whether it did.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn init(
        &self,
        initial: Arc<NodesConfig>,
        wait_until_initialized: bool,
    ) -> Result<bool, Fatal> {
        if self.inner.shutdown_signaled() {
            return Ok(true);
        }
        self.inner.tx_api.send(NcmMsg::Init { nc: initial }).map_err(|_| Fatal::Stopped)?;

        if wait_until_initialized {
            let res = self.wait(None).initialized("init").await;
            return Ok(res.is_ok());
        }
        Ok(true)
    }

    /// Lock-free snapshot of the last locally published configuration.
    ///
    /// Consecutive calls observe monotonically non-decreasing versions.
    pub fn get_config(&self) -> Option<Arc<NodesConfig>> {
        self.inner.rx_local.borrow().clone()
    }

    /// Version-wise max of the published, pending and staged configurations;
    /// the base every proposer folds its updates onto.
    pub async fn latest_known_config(&self) -> Result<Arc<NodesConfig>, Fatal> {
        let (tx, rx) = oneshot::channel();
        self.inner.tx_api.send(NcmMsg::GetLatestKnown { tx }).map_err(|_| Fatal::Stopped)?;
        rx.await.map_err(|_| Fatal::Stopped)
    }

    /// The slot worker contexts read: tracks the configuration currently
    /// being (or last) fanned out.
    pub fn watch_worker_config(&self) -> watch::Receiver<Option<Arc<NodesConfig>>> {
        self.inner.rx_worker_nc.clone()
    }

    /// A receiver of the metrics channel.
    pub fn metrics(&self) -> watch::Receiver<NcmMetrics> {
        self.inner.rx_metrics.clone()
    }

    /// Wait helper over the metrics channel. `timeout` defaults to
    /// `Config::init_timeout`.
    pub fn wait(&self, timeout: Option<Duration>) -> Wait {
        Wait {
            timeout: timeout.unwrap_or_else(|| self.inner.config.init_wait()),
            rx: self.inner.rx_metrics.clone(),
        }
    }

    pub fn mode(&self) -> OperationMode {
        self.inner.mode.load()
    }

    /// Grant this instance the proposer capability.
    ///
    /// A storage node should only be upgraded once it sees itself in the
    /// membership; the caller decides when.
    pub fn upgrade_to_proposer(&self) {
        self.inner.mode.upgrade_to_proposer();
    }

    /// Enable or disable the heartbeat at runtime.
    pub fn enable_heartbeat(&self, enabled: bool) {
        self.inner.tick_handle.enable(enabled);
    }

    /// Push entry point: feed a serialized configuration observed from the
    /// store into the pipeline.
    pub fn on_new_config(&self, bytes: Vec<u8>) -> Result<(), Fatal> {
        self.inner.tx_api.send(NcmMsg::NewConfig { bytes }).map_err(|_| Fatal::Stopped)
    }

    /// Push entry point for already deserialized configurations.
    pub fn on_new_config_parsed(&self, nc: Arc<NodesConfig>) -> Result<(), Fatal> {
        self.inner.tx_api.send(NcmMsg::NewConfigParsed { nc }).map_err(|_| Fatal::Stopped)
    }

    /// Propose a single update; see [`update`](Self::update).
    pub async fn update_one(&self, update: ConfigUpdate) -> Result<Arc<NodesConfig>, UpdateError> {
        self.update(vec![update]).await
    }

    /// Propose a batch of updates.
    ///
    /// Requires the proposer capability. The updates are folded onto the
    /// latest known configuration and written to the store with a CAS on the
    /// base version; on success the new configuration is also routed through
    /// the local observe pipeline. On a CAS conflict the store's current
    /// configuration is returned (best-effort) in
    /// [`UpdateError::VersionMismatch`].
    #[tracing::instrument(level = "debug", skip_all, fields(updates = updates.len()))]
    pub async fn update(&self, updates: Vec<ConfigUpdate>) -> Result<Arc<NodesConfig>, UpdateError> {
        if self.inner.shutdown_signaled() {
            return Err(UpdateError::Shutdown);
        }
        if !self.inner.mode.load().is_proposer() {
            return Err(UpdateError::Access);
        }
        NcmStats::incr(&self.inner.stats.updates_requested);

        let updates_str = updates.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(", ");

        let (tx, rx) = oneshot::channel();
        let res = self.inner.call_core_update(NcmMsg::Update { updates, tx }, rx).await;

        // Only trace successful updates, and only while not shutting down.
        if let Ok(nc) = &res {
            if !self.inner.shutdown_signaled() {
                self.inner.tracer.trace(TraceSample {
                    nc_update_gen: Some(Box::new(move || updates_str)),
                    published_nc: Some(nc.clone()),
                    source: TraceSource::NcmUpdate,
                });
            }
        }
        res
    }

    /// Unconditionally replace the stored configuration; the emergency
    /// tooling path.
    ///
    /// Requires the tooling capability. The configuration must carry a real
    /// version.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn overwrite(&self, nc: Arc<NodesConfig>) -> Result<Arc<NodesConfig>, OverwriteError> {
        if self.inner.shutdown_signaled() {
            return Err(OverwriteError::Shutdown);
        }
        if !self.inner.mode.load().is_tooling() {
            return Err(OverwriteError::Access);
        }
        if nc.version().is_empty() {
            return Err(OverwriteError::InvalidParam);
        }
        NcmStats::incr(&self.inner.stats.overwrites_requested);

        let serialized = C::Codec::serialize(&nc).map_err(OverwriteError::Serialization)?;
        let stored_version =
            self.inner.store.overwrite(serialized).await.map_err(OverwriteError::Store)?;
        debug_assert_eq!(stored_version, nc.version());

        // Route the overwritten config through the observe path so the local
        // view converges without waiting for the next heartbeat.
        let _ = self.inner.tx_api.send(NcmMsg::NewConfigParsed { nc: nc.clone() });

        if !self.inner.shutdown_signaled() {
            let json = C::Codec::debug_json_string(&nc);
            self.inner.tracer.trace(TraceSample {
                nc_update_gen: Some(Box::new(move || json)),
                published_nc: Some(nc.clone()),
                source: TraceSource::NcmOverwrite,
            });
        }
        Ok(nc)
    }

    /// Signal shutdown and wait for the core task to stop.
    ///
    /// Idempotent; public entry points fail with a shutdown error from the
    /// moment this is called. In-flight operations still resolve exactly
    /// once.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn shutdown(&self) -> Result<(), Fatal> {
        self.inner.shutdown_signaled.store(true, Ordering::Release);
        tracing::info!("NCM shutting down...");

        self.inner.tick_handle.shutdown();

        if let Some(tx) = self.inner.tx_shutdown.lock().await.take() {
            let _ = tx.send(());
        }

        let mut state = self.inner.core_state.lock().await;
        if let CoreState::Running(handle) = std::mem::replace(&mut *state, CoreState::Done) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    return Err(Fatal::Panicked);
                }
            }
        }
        Ok(())
    }
}
