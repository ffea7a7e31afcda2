//! Nodes configuration management for a distributed log-storage cluster.
//!
//! Every process in the cluster (storage nodes, sequencers, tooling and
//! read-only clients) runs one [`NodesConfigManager`]. It observes the
//! authoritative membership/topology configuration from a shared
//! compare-and-swap store, pushes each new version through a
//! staged → pending → published pipeline that notifies every worker context,
//! and, on instances holding the proposer capability, submits configuration
//! updates back to the store.
//!
//! The core pieces:
//!
//! - [`NodesConfig`]: the immutable, versioned configuration value.
//! - [`OperationMode`]: which operations this instance may perform.
//! - [`NodesConfigManager`]: the public handle; it spawns a single-writer
//!   core task that owns all pipeline state.
//! - [`ShardStateTracker`]: watches shards stuck in intermediary storage
//!   states and lets proposers force them onward after a timeout.
//! - [`NcmTypeConfig`]: selects the store, codec, worker fan-out and tracer
//!   implementations.
//!
//! Callers that must not race ahead of initialization use
//! [`NodesConfigManager::init`] with `wait_until_initialized`, or the
//! [`Wait`] helper over the metrics channel.

#![deny(unused_qualifications)]

pub mod codec;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod manager;
pub mod metrics;
pub mod mode;
pub mod nodes_config;
pub mod store;
pub mod tracer;
pub mod tracker;
pub mod type_config;
pub mod workers;

pub(crate) mod core;
pub(crate) mod utils;


pub use anyerror;
pub use anyerror::AnyError;

pub use crate::codec::CodecError;
pub use crate::codec::ConfigCodec;
pub use crate::codec::JsonCodec;
pub use crate::config::Config;
pub use crate::config::ConfigError;
pub use crate::error::Fatal;
pub use crate::error::OverwriteError;
pub use crate::error::UpdateError;
pub use crate::error::UpdateRejected;
pub use crate::manager::NodesConfigManager;
pub use crate::metrics::NcmMetrics;
pub use crate::metrics::Wait;
pub use crate::metrics::WaitError;
pub use crate::mode::OperationMode;
pub use crate::nodes_config::ConfigUpdate;
pub use crate::nodes_config::ConfigVersion;
pub use crate::nodes_config::NodeRole;
pub use crate::nodes_config::NodeState;
pub use crate::nodes_config::NodesConfig;
pub use crate::nodes_config::ShardId;
pub use crate::nodes_config::StorageState;
pub use crate::store::CasError;
pub use crate::store::ConfigStore;
pub use crate::store::StoreError;
pub use crate::tracer::ConfigTracer;
pub use crate::tracer::LogTracer;
pub use crate::tracer::TraceSample;
pub use crate::tracer::TraceSource;
pub use crate::tracker::ShardStateTracker;
pub use crate::type_config::NcmTypeConfig;
pub use crate::workers::WorkerPool;
