use std::sync::Arc;

use anyhow::Result;
use nodecfg::ConfigVersion;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;

use crate::fixtures::config_of;
use crate::fixtures::serialized;
use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Delivering the same serialized configuration twice counts two receipts
/// but publishes exactly once.
#[tokio::test]
async fn test_duplicate_observation_publishes_once() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let bytes = serialized(&config_of(7, &[1]));
    h.manager.on_new_config(bytes.clone())?;
    h.manager.on_new_config(bytes)?;

    h.manager.wait(None).published_version(ConfigVersion::new(7), "publish v7").await?;

    let metrics = h.manager.metrics().borrow().clone();
    assert_eq!(2, metrics.config_received);
    assert_eq!(0, metrics.serialization_errors);
    assert_eq!(ConfigVersion::new(7), metrics.published_version);

    let v7_fanouts =
        h.workers.published().iter().filter(|v| **v == ConfigVersion::new(7)).count();
    assert_eq!(1, v7_fanouts);

    h.manager.shutdown().await?;
    Ok(())
}

/// Observations below the published version are dropped.
#[tokio::test]
async fn test_stale_observation_dropped() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    h.manager.on_new_config(serialized(&config_of(7, &[1])))?;
    h.manager.wait(None).published_version(ConfigVersion::new(7), "publish v7").await?;

    h.manager.on_new_config(serialized(&config_of(3, &[1])))?;
    h.manager
        .wait(None)
        .metrics(|m| m.config_received == 2, "both observations counted")
        .await?;

    // Still at v7; the stale version never reached the workers.
    assert_eq!(Some(ConfigVersion::new(7)), h.manager.get_config().map(|nc| nc.version()));
    assert!(!h.workers.published().contains(&ConfigVersion::new(3)));

    h.manager.shutdown().await?;
    Ok(())
}

/// Out-of-order stagings: a newer staged version supersedes an older one
/// while a publication is in flight, and workers still see increasing
/// versions.
#[tokio::test]
async fn test_newer_staging_supersedes_older() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    for v in [2u64, 3, 4] {
        h.manager.on_new_config(serialized(&config_of(v, &[1])))?;
    }

    h.manager.wait(None).published_version(ConfigVersion::new(4), "publish v4").await?;

    let published = h.workers.published();
    let mut sorted = published.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(published, sorted, "workers must observe strictly increasing versions");
    assert_eq!(Some(&ConfigVersion::new(4)), published.last());

    h.manager.shutdown().await?;
    Ok(())
}
