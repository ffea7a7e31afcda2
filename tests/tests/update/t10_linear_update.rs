use std::sync::Arc;

use anyhow::Result;
use nodecfg::ConfigCodec;
use nodecfg::ConfigUpdate;
use nodecfg::ConfigVersion;
use nodecfg::JsonCodec;
use nodecfg::NodeState;
use nodecfg::NodesConfig;
use nodecfg::OperationMode;
use nodecfg::TraceSource;

use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// A single proposer folding one update onto the latest known config: the
/// CAS lands, the result is routed through the local pipeline, and the
/// tracer records the publication.
#[tokio::test]
async fn test_single_proposer_linear_update() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let nc1 = h
        .manager
        .update_one(ConfigUpdate::AddNode { node: 1, state: NodeState::default() })
        .await?;
    assert_eq!(ConfigVersion::new(1), nc1.version());
    assert!(nc1.node(1).is_some());

    // The store now holds exactly the returned config.
    let (stored_version, stored) = h.store.current();
    assert_eq!(ConfigVersion::new(1), stored_version);
    assert_eq!(*nc1, JsonCodec::deserialize(&stored.unwrap())?);

    // The CAS result converges the local view without a store round-trip.
    h.manager.wait(None).published_version(ConfigVersion::new(1), "publish v1").await?;
    assert_eq!(Some(ConfigVersion::new(1)), h.manager.get_config().map(|nc| nc.version()));

    let metrics = h.manager.metrics().borrow().clone();
    assert_eq!(1, metrics.updates_requested);
    assert_eq!(2, metrics.config_published);

    // Workers observed versions in strictly increasing order, and the
    // worker-visible slot tracks the last fan-out.
    assert_eq!(vec![ConfigVersion::EMPTY, ConfigVersion::new(1)], h.workers.published());
    assert_eq!(
        Some(ConfigVersion::new(1)),
        h.manager.watch_worker_config().borrow().as_ref().map(|nc| nc.version())
    );

    // Exactly one trace sample, from the update path.
    assert_eq!(vec![(TraceSource::NcmUpdate, ConfigVersion::new(1))], h.tracer.samples());

    h.manager.shutdown().await?;
    Ok(())
}

/// Consecutive updates base each CAS on the previous result.
#[tokio::test]
async fn test_consecutive_updates_stay_contiguous() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    for i in 1..=3u64 {
        let nc = h
            .manager
            .update_one(ConfigUpdate::AddNode { node: i, state: NodeState::default() })
            .await?;
        assert_eq!(ConfigVersion::new(i), nc.version());
    }

    h.manager.wait(None).published_version(ConfigVersion::new(3), "publish v3").await?;
    let latest = h.manager.latest_known_config().await?;
    assert_eq!(ConfigVersion::new(3), latest.version());
    assert_eq!(3, latest.nodes().len());

    h.manager.shutdown().await?;
    Ok(())
}

/// A batch of updates is folded into one CAS write: one version bump, one
/// publication.
#[tokio::test]
async fn test_batched_updates_write_once() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;
    assert!(h.manager.init(Arc::new(NodesConfig::new()), true).await?);

    let nc = h
        .manager
        .update(vec![
            ConfigUpdate::AddNode { node: 1, state: NodeState::default() },
            ConfigUpdate::AddNode { node: 2, state: NodeState::default() },
            ConfigUpdate::SetSequencerEnabled { node: 2, enabled: true },
        ])
        .await?;

    assert_eq!(ConfigVersion::new(1), nc.version());
    assert!(nc.is_sequencing_enabled(2));
    assert_eq!(ConfigVersion::new(1), h.store.current().0);

    h.manager.shutdown().await?;
    Ok(())
}
