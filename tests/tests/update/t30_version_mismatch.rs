use std::sync::Arc;

use anyhow::Result;
use nodecfg::ConfigUpdate;
use nodecfg::ConfigVersion;
use nodecfg::NodeState;
use nodecfg::OperationMode;
use nodecfg::UpdateError;

use crate::fixtures::config_of;
use crate::fixtures::serialized;
use crate::fixtures::test_config;
use crate::fixtures::NcmHarness;

/// A CAS conflict surfaces the store's current configuration to the caller
/// and feeds it through the local pipeline, which publishes it exactly once.
#[tokio::test]
async fn test_cas_conflict_converges_on_stored_config() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    let nc5 = config_of(5, &[1]);
    h.store.seed(nc5.version(), serialized(&nc5));
    assert!(h.manager.init(Arc::new(nc5), true).await?);

    tracing::info!("--- another proposer wins the race: the store moves on to v6");
    let nc6 = config_of(6, &[1, 2]);
    h.store.seed(nc6.version(), serialized(&nc6));

    let res = h
        .manager
        .update_one(ConfigUpdate::AddNode { node: 9, state: NodeState::default() })
        .await;
    match res {
        Err(UpdateError::VersionMismatch { stored_version, stored }) => {
            assert_eq!(ConfigVersion::new(6), stored_version);
            let stored = stored.expect("conflict should carry the stored config");
            assert_eq!(nc6, *stored);
        }
        other => panic!("expected VersionMismatch, got {:?}", other),
    }

    // The losing proposer's local view converges on the winner's config.
    h.manager.wait(None).published_version(ConfigVersion::new(6), "converge on v6").await?;
    assert_eq!(Some(ConfigVersion::new(6)), h.manager.get_config().map(|nc| nc.version()));

    let v6_fanouts =
        h.workers.published().iter().filter(|v| **v == ConfigVersion::new(6)).count();
    assert_eq!(1, v6_fanouts);

    // The store still holds the winner's config.
    assert_eq!(ConfigVersion::new(6), h.store.current().0);

    // Failed updates produce no trace sample.
    assert!(h.tracer.samples().is_empty());

    h.manager.shutdown().await?;
    Ok(())
}

/// Retrying after a conflict folds the update onto the converged base and
/// succeeds.
#[tokio::test]
async fn test_retry_after_conflict_succeeds() -> Result<()> {
    let h = NcmHarness::new(OperationMode::for_tooling(), test_config())?;

    let nc5 = config_of(5, &[1]);
    h.store.seed(nc5.version(), serialized(&nc5));
    assert!(h.manager.init(Arc::new(nc5), true).await?);

    let nc6 = config_of(6, &[1, 2]);
    h.store.seed(nc6.version(), serialized(&nc6));

    let update = ConfigUpdate::AddNode { node: 9, state: NodeState::default() };
    let res = h.manager.update_one(update.clone()).await;
    assert!(matches!(res, Err(UpdateError::VersionMismatch { .. })));

    // The conflict already fed v6 into the pipeline; the retry bases on it.
    h.manager.wait(None).published_version(ConfigVersion::new(6), "converge on v6").await?;
    let nc7 = h.manager.update_one(update).await?;
    assert_eq!(ConfigVersion::new(7), nc7.version());
    assert!(nc7.node(9).is_some());
    assert!(nc7.node(2).is_some());

    h.manager.shutdown().await?;
    Ok(())
}
