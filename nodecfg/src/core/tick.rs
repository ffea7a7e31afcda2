//! Tick emitter: posts a heartbeat message onto the NCM task at a fixed
//! interval.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tracing::Instrument;
use tracing::Level;

use crate::core::NcmMsg;

pub(crate) struct Tick {
    interval: Duration,

    tx: mpsc::UnboundedSender<NcmMsg>,

    enabled: Arc<AtomicBool>,
}

pub(crate) struct TickHandle {
    enabled: Arc<AtomicBool>,
    join_handle: JoinHandle<()>,
}

impl Tick {
    pub(crate) fn spawn(
        interval: Duration,
        tx: mpsc::UnboundedSender<NcmMsg>,
        enabled: bool,
    ) -> TickHandle {
        let enabled = Arc::new(AtomicBool::new(enabled));
        let t = Tick { interval, tx, enabled: enabled.clone() };

        let join_handle = tokio::spawn(
            async move {
                loop {
                    let at = Instant::now() + t.interval;
                    sleep_until(at).await;

                    if !t.enabled.load(Ordering::Relaxed) {
                        continue;
                    }

                    let send_res = t.tx.send(NcmMsg::Tick);
                    if send_res.is_err() {
                        tracing::info!("tick fails to send, receiving end quit");
                        return;
                    }
                }
            }
            .instrument(tracing::span!(Level::DEBUG, "tick")),
        );

        TickHandle { enabled, join_handle }
    }
}

impl TickHandle {
    pub(crate) fn enable(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn shutdown(&self) {
        self.join_handle.abort();
    }
}
