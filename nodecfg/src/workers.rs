//! Fan-out of published configurations to worker contexts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::nodes_config::NodesConfig;

/// Executor that runs the per-worker configuration-update hook.
///
/// The contract: the returned future completes once *every* worker has run
/// its `on_nodes_config_updated` handler against `nc`. The core publishes at
/// most one configuration at a time and waits for the collective before
/// committing it locally, so any given worker observes versions in strictly
/// increasing order. Ordering *across* workers is unobservable.
///
/// A stuck worker blocks publication of newer versions; that is accepted,
/// since every worker must see every published config anyway.
#[async_trait]
pub trait WorkerPool: Send + Sync + 'static {
    async fn fulfill_on_all_workers(&self, nc: Arc<NodesConfig>);
}

/// For instances with no worker contexts (e.g. thin clients and tooling).
#[async_trait]
impl WorkerPool for () {
    async fn fulfill_on_all_workers(&self, _nc: Arc<NodesConfig>) {}
}
