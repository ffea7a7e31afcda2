use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::UpdateError;
use crate::nodes_config::ConfigUpdate;
use crate::nodes_config::NodesConfig;

/// A oneshot TX carrying a result from the NCM task back to the caller.
///
/// Dropping it unanswered is how a dead core surfaces as an error on the
/// calling side; a sent value is delivered exactly once.
pub(crate) type ResultSender<T, E> = oneshot::Sender<Result<T, E>>;

/// A message posted onto the NCM task.
///
/// Posted by the public handle, by the tick emitter, and by continuations
/// the core spawned itself (store CAS results, worker fan-out completion).
pub(crate) enum NcmMsg {
    /// Seed the pipeline with the initial configuration and start
    /// heartbeating.
    Init { nc: Arc<NodesConfig> },

    /// A serialized configuration observed from the store.
    NewConfig { bytes: Vec<u8> },

    /// An already deserialized configuration (CAS results and pushes from
    /// in-process collaborators).
    NewConfigParsed { nc: Arc<NodesConfig> },

    /// Fan-out to all workers finished for the pending configuration.
    ProcessingFinished { nc: Arc<NodesConfig> },

    /// Proposer update request.
    Update {
        updates: Vec<ConfigUpdate>,
        tx: ResultSender<Arc<NodesConfig>, UpdateError>,
    },

    /// Version-wise max of the local/pending/staged configurations.
    GetLatestKnown { tx: oneshot::Sender<Arc<NodesConfig>> },

    /// Heartbeat tick.
    Tick,
}

impl fmt::Display for NcmMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NcmMsg::Init { nc } => write!(f, "Init(v{})", nc.version()),
            NcmMsg::NewConfig { bytes } => write!(f, "NewConfig({} bytes)", bytes.len()),
            NcmMsg::NewConfigParsed { nc } => write!(f, "NewConfigParsed(v{})", nc.version()),
            NcmMsg::ProcessingFinished { nc } => write!(f, "ProcessingFinished(v{})", nc.version()),
            NcmMsg::Update { updates, .. } => write!(f, "Update({} updates)", updates.len()),
            NcmMsg::GetLatestKnown { .. } => write!(f, "GetLatestKnown"),
            NcmMsg::Tick => write!(f, "Tick"),
        }
    }
}
