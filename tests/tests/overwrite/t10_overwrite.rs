use std::sync::Arc;

use anyhow::Result;
use maplit::btreeset;
use nodecfg::ConfigVersion;
use nodecfg::NodeRole;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;
use nodecfg::OverwriteError;
use nodecfg::TraceSource;

use crate::fixtures::config_of;
use crate::fixtures::serialized;
use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Tooling replaces the stored configuration unconditionally; the local
/// view follows.
#[tokio::test]
async fn test_tooling_overwrite() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    // The store holds a newer version; overwrite wins anyway.
    let nc12 = config_of(12, &[1, 2]);
    h.store.seed(nc12.version(), serialized(&nc12));
    assert!(h.manager.init(Arc::new(nc12), true).await?);

    let nc9 = config_of(9, &[3]);
    let got = h.manager.overwrite(Arc::new(nc9.clone())).await?;
    assert_eq!(ConfigVersion::new(9), got.version());

    assert_eq!(ConfigVersion::new(9), h.store.current().0);

    // The overwritten config is fed through the observe path, but v9 is
    // below the already published v12, so the local view keeps v12.
    let latest = h.manager.latest_known_config().await?;
    assert_eq!(ConfigVersion::new(12), latest.version());

    assert_eq!(1, h.manager.metrics().borrow().overwrites_requested);
    assert_eq!(vec![(TraceSource::NcmOverwrite, ConfigVersion::new(9))], h.tracer.samples());

    h.manager.shutdown().await?;
    Ok(())
}

/// An overwrite above the local version converges the local view on it.
#[tokio::test]
async fn test_overwrite_converges_local_view() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let nc9 = config_of(9, &[3]);
    h.manager.overwrite(Arc::new(nc9)).await?;

    h.manager.wait(None).published_version(ConfigVersion::new(9), "publish v9").await?;
    assert_eq!(Some(ConfigVersion::new(9)), h.manager.get_config().map(|nc| nc.version()));

    h.manager.shutdown().await?;
    Ok(())
}

/// Overwriting with an unversioned configuration is an invalid parameter;
/// non-tooling instances are denied.
#[tokio::test]
async fn test_overwrite_validation() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let res = h.manager.overwrite(Arc::new(NodesConfig::new())).await;
    assert!(matches!(res, Err(OverwriteError::InvalidParam)));
    h.manager.shutdown().await?;

    // A storage server is not tooling.
    let mode = OperationMode::for_node_roles(&btreeset! {NodeRole::Storage});
    let h = NcmHarness::new(mode, test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let res = h.manager.overwrite(Arc::new(config_of(1, &[1]))).await;
    assert!(matches!(res, Err(OverwriteError::Access)));
    assert_eq!(0, h.manager.metrics().borrow().overwrites_requested);

    h.manager.shutdown().await?;
    Ok(())
}
