use std::sync::Arc;

use anyhow::Result;
use nodecfg::ConfigVersion;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;

use crate::fixtures::config_of;
use crate::fixtures::serialized;
use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// Garbage bytes only bump the serialization-error counter; the pipeline is
/// untouched.
#[tokio::test]
async fn test_garbage_bytes_counted_and_dropped() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    h.manager.on_new_config(b"garbage".to_vec())?;
    h.manager
        .wait(None)
        .metrics(|m| m.serialization_errors == 1, "serialization error counted")
        .await?;

    let metrics = h.manager.metrics().borrow().clone();
    assert_eq!(1, metrics.config_received);
    assert_eq!(ConfigVersion::EMPTY, metrics.published_version);

    h.manager.shutdown().await?;
    Ok(())
}

/// A blob whose header shows an already-processed version is dropped before
/// its body is ever parsed: no serialization error even though the body is
/// garbage.
#[tokio::test]
async fn test_processed_version_skips_deserialization() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    h.manager.on_new_config(serialized(&config_of(7, &[1])))?;
    h.manager.wait(None).published_version(ConfigVersion::new(7), "publish v7").await?;

    // Valid header declaring v5, body that would never deserialize.
    let mut stale = 5u64.to_be_bytes().to_vec();
    stale.extend_from_slice(b"this is not json");
    h.manager.on_new_config(stale)?;

    h.manager
        .wait(None)
        .metrics(|m| m.config_received == 2, "second receipt counted")
        .await?;
    assert_eq!(0, h.manager.metrics().borrow().serialization_errors);

    h.manager.shutdown().await?;
    Ok(())
}

/// A decodable header is not enough: if the body fails to parse, the error
/// is counted and the observation dropped.
#[tokio::test]
async fn test_unparsable_body_counted() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_client(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let mut bad = 9u64.to_be_bytes().to_vec();
    bad.extend_from_slice(b"{\"version\": \"mangled\"");
    h.manager.on_new_config(bad)?;

    h.manager
        .wait(None)
        .metrics(|m| m.serialization_errors == 1, "decode failure counted")
        .await?;
    assert_eq!(ConfigVersion::EMPTY, h.manager.metrics().borrow().published_version);

    h.manager.shutdown().await?;
    Ok(())
}
