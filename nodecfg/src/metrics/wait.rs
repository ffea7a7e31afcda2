use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout_at;
use tokio::time::Instant;

use crate::metrics::NcmMetrics;
use crate::nodes_config::ConfigVersion;

/// Error variants related to waiting for metrics conditions.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// Timeout occurred while waiting for a condition.
    #[error("timeout after {0:?} when {1}")]
    Timeout(Duration, String),

    /// The NCM is shutting down.
    #[error("NCM is shutting down")]
    ShuttingDown,
}

/// Wait wraps the metrics channel with utils to wait for the metrics to
/// satisfy some condition.
pub struct Wait {
    /// The timeout duration for waiting operations.
    pub timeout: Duration,
    /// The metrics receiver channel.
    pub rx: watch::Receiver<NcmMetrics>,
}

impl Wait {
    /// Wait for the metrics to satisfy `func`, or time out.
    #[tracing::instrument(level = "trace", skip(self, func), fields(msg=%msg.to_string()))]
    pub async fn metrics<T>(&self, func: T, msg: impl ToString) -> Result<NcmMetrics, WaitError>
    where T: Fn(&NcmMetrics) -> bool + Send {
        let timeout_at_instant = Instant::now() + self.timeout;

        let mut rx = self.rx.clone();
        loop {
            let latest = rx.borrow().clone();

            if func(&latest) {
                tracing::debug!("done wait {}; latest: {}", msg.to_string(), latest);
                return Ok(latest);
            }

            if Instant::now() >= timeout_at_instant {
                return Err(WaitError::Timeout(
                    self.timeout,
                    format!("{}; latest: {}", msg.to_string(), latest),
                ));
            }

            match timeout_at(timeout_at_instant, rx.changed()).await {
                Ok(Ok(())) => {
                    // metrics changed, continue the waiting loop
                }
                Ok(Err(_)) => {
                    tracing::debug!("metrics channel closed while waiting for {}", msg.to_string());
                    return Err(WaitError::ShuttingDown);
                }
                Err(_) => {
                    return Err(WaitError::Timeout(
                        self.timeout,
                        format!("{}; latest: {}", msg.to_string(), latest),
                    ));
                }
            }
        }
    }

    /// Wait until the first configuration made it through the publish
    /// pipeline.
    pub async fn initialized(&self, msg: impl ToString) -> Result<NcmMetrics, WaitError> {
        self.metrics(|m| m.initialized, msg).await
    }

    /// Wait until the locally published version reaches `version`.
    pub async fn published_version(
        &self,
        version: ConfigVersion,
        msg: impl ToString,
    ) -> Result<NcmMetrics, WaitError> {
        self.metrics(|m| m.published_version >= version, msg).await
    }
}
