//! Observable state of an NCM instance.
//!
//! The core publishes an [`NcmMetrics`] snapshot over a `watch` channel
//! every time something changes. [`Wait`] turns that channel into "block
//! until the metrics satisfy a condition, or time out"; initialization
//! waiting and most tests are built on it.

mod ncm_metrics;
mod stats;
mod wait;


pub use ncm_metrics::NcmMetrics;
pub(crate) use stats::NcmStats;
pub use wait::Wait;
pub use wait::WaitError;
