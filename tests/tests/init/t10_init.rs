use std::sync::Arc;

use anyhow::Result;
use nodecfg::ConfigVersion;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;

use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Seeding the pipeline with an empty configuration completes initialization
/// within the configured bound.
#[tokio::test]
async fn test_init_with_empty_config() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    let initialized = h.manager.init(Arc::new(NodesConfig::new()), true).await?;
    assert!(initialized);

    let metrics = h.manager.metrics().borrow().clone();
    assert!(metrics.started);
    assert!(metrics.initialized);
    assert_eq!(1, metrics.config_published);
    assert_eq!(ConfigVersion::EMPTY, metrics.published_version);

    // The empty config went through the whole pipeline, workers included.
    assert_eq!(vec![ConfigVersion::EMPTY], h.workers.published());
    assert_eq!(
        Some(ConfigVersion::EMPTY),
        h.manager.get_config().map(|nc| nc.version())
    );

    h.manager.shutdown().await?;
    Ok(())
}

/// `wait_until_initialized = false` returns at once; the pipeline catches up
/// in the background.
#[tokio::test]
async fn test_init_without_waiting() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    assert!(h.manager.init(Arc::new(NodesConfig::new()), false).await?);
    h.manager.wait(None).initialized("background init").await?;

    h.manager.shutdown().await?;
    Ok(())
}

/// Re-observing the already published version changes nothing.
#[tokio::test]
async fn test_reinit_is_a_noop() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    // A round-trip through the core guarantees the second seed was handled.
    let latest = h.manager.latest_known_config().await?;
    assert_eq!(ConfigVersion::EMPTY, latest.version());

    // Still exactly one publication.
    let metrics = h.manager.metrics().borrow().clone();
    assert_eq!(1, metrics.config_published);
    assert_eq!(vec![ConfigVersion::EMPTY], h.workers.published());

    h.manager.shutdown().await?;
    Ok(())
}
