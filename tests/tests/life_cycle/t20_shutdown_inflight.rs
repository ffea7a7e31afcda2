use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nodecfg::ConfigUpdate;
use nodecfg::NodeState;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;
use nodecfg::UpdateError;

use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Shutting down while an update's CAS is in flight: the caller still gets
/// exactly one answer, either the store's outcome or a shutdown error, and
/// `shutdown()` itself completes.
#[tokio::test]
async fn test_shutdown_during_inflight_update() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    h.store.set_write_delay(Some(Duration::from_millis(200)));

    let manager = h.manager.clone();
    let inflight = tokio::spawn(async move {
        manager
            .update_one(ConfigUpdate::AddNode { node: 1, state: NodeState::default() })
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.manager.shutdown().await?;

    let res = inflight.await?;
    match res {
        Ok(nc) => assert_eq!(1, nc.version().val()),
        Err(UpdateError::Shutdown) => {}
        Err(other) => panic!("expected the real outcome or Shutdown, got {:?}", other),
    }

    // No trace sample for a publication that raced shutdown.
    assert!(h.tracer.samples().is_empty());
    Ok(())
}
