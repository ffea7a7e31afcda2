use std::sync::Arc;

use anyhow::Result;
use nodecfg::AnyError;
use nodecfg::ConfigUpdate;
use nodecfg::ConfigVersion;
use nodecfg::NodeState;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;
use nodecfg::StoreError;
use nodecfg::UpdateError;

use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Transient store failures are handed to the caller unchanged; the core
/// does not retry on its own.
#[tokio::test]
async fn test_transient_store_error_propagates() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    h.store.fail_next_write(StoreError::Again(AnyError::error("leader election in progress")));

    let update = ConfigUpdate::AddNode { node: 1, state: NodeState::default() };
    let res = h.manager.update_one(update.clone()).await;
    assert!(matches!(res, Err(UpdateError::Store(StoreError::Again(_)))));

    // Nothing was staged or published for the failed attempt.
    assert_eq!(ConfigVersion::EMPTY, h.manager.metrics().borrow().published_version);
    assert!(h.tracer.samples().is_empty());

    // The caller owns the retry decision.
    let nc1 = h.manager.update_one(update).await?;
    assert_eq!(ConfigVersion::new(1), nc1.version());

    h.manager.shutdown().await?;
    Ok(())
}
