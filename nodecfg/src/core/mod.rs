//! The single-writer task owning the configuration pipeline.
//!
//! `NcmCore` is spawned once per [`NodesConfigManager`] and owns every
//! mutation of the staged/pending/published slots and the shard-state
//! tracker. Everything else talks to it by posting [`NcmMsg`]s.
//!
//! [`NodesConfigManager`]: crate::manager::NodesConfigManager

mod ncm_core;
mod ncm_msg;
mod tick;

pub(crate) use ncm_core::NcmCore;
pub(crate) use ncm_msg::NcmMsg;
pub(crate) use ncm_msg::ResultSender;
pub(crate) use tick::Tick;
pub(crate) use tick::TickHandle;
