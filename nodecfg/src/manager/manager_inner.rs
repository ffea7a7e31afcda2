use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core::NcmMsg;
use crate::core::TickHandle;
use crate::error::Fatal;
use crate::error::UpdateError;
use crate::manager::core_state::CoreState;
use crate::metrics::NcmMetrics;
use crate::metrics::NcmStats;
use crate::mode::SharedOperationMode;
use crate::nodes_config::NodesConfig;
use crate::type_config::NcmTypeConfig;

/// The shared internals behind a [`NodesConfigManager`] handle.
///
/// [`NodesConfigManager`]: crate::manager::NodesConfigManager
pub(in crate::manager) struct NcmInner<C>
where C: NcmTypeConfig
{
    pub(in crate::manager) config: Arc<Config>,
    pub(in crate::manager) mode: Arc<SharedOperationMode>,
    pub(in crate::manager) stats: Arc<NcmStats>,
    pub(in crate::manager) store: Arc<C::Store>,
    pub(in crate::manager) tracer: Arc<C::Tracer>,

    pub(in crate::manager) shutdown_signaled: Arc<AtomicBool>,

    pub(in crate::manager) tx_api: mpsc::UnboundedSender<NcmMsg>,
    pub(in crate::manager) rx_metrics: watch::Receiver<NcmMetrics>,
    pub(in crate::manager) rx_local: watch::Receiver<Option<Arc<NodesConfig>>>,
    pub(in crate::manager) rx_worker_nc: watch::Receiver<Option<Arc<NodesConfig>>>,

    pub(in crate::manager) tick_handle: TickHandle,
    pub(in crate::manager) tx_shutdown: Mutex<Option<oneshot::Sender<()>>>,
    pub(in crate::manager) core_state: Mutex<CoreState>,
}

impl<C> NcmInner<C>
where C: NcmTypeConfig
{
    pub(in crate::manager) fn shutdown_signaled(&self) -> bool {
        self.shutdown_signaled.load(Ordering::Acquire)
    }

    /// Post an update message onto the core and wait for its answer.
    ///
    /// A closed channel in either direction means the core went away; that
    /// is a plain `Shutdown` when shutdown was signalled and a [`Fatal`]
    /// otherwise.
    pub(in crate::manager) async fn call_core_update(
        &self,
        msg: NcmMsg,
        rx: oneshot::Receiver<Result<Arc<NodesConfig>, UpdateError>>,
    ) -> Result<Arc<NodesConfig>, UpdateError> {
        if self.tx_api.send(msg).is_err() {
            return Err(self.core_gone_error());
        }

        match rx.await {
            Ok(res) => res,
            Err(_) => Err(self.core_gone_error()),
        }
    }

    fn core_gone_error(&self) -> UpdateError {
        if self.shutdown_signaled() {
            UpdateError::Shutdown
        } else {
            UpdateError::Fatal(Fatal::Stopped)
        }
    }
}
