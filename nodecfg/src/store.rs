//! The external compare-and-swap store holding the authoritative
//! configuration.
//!
//! The store is the linearization point across the fleet: concurrent
//! proposers race through [`ConfigStore::update_config`], and exactly one
//! CAS per base version succeeds. The NCM core never blocks on store calls;
//! it posts continuations back onto its own context.

use anyerror::AnyError;
use async_trait::async_trait;

use crate::nodes_config::ConfigVersion;

/// Store-side failures the core understands.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Transient failure; the caller may retry.
    #[error("store temporarily unavailable: {0}")]
    Again(AnyError),

    /// The store denied access.
    #[error("access to the store was denied: {0}")]
    Access(AnyError),

    /// The store holds an unparsable blob.
    #[error("store holds a malformed configuration: {0}")]
    BadMsg(AnyError),

    /// The store itself is shutting down.
    #[error("store is shutting down")]
    Shutdown,

    #[error("invalid store parameter: {0}")]
    InvalidParam(AnyError),

    #[error("store error: {0}")]
    Other(AnyError),
}

/// Outcome of a failed compare-and-swap write.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CasError {
    /// The store's current version did not equal the base version. `stored`
    /// carries the store's current blob when the store knows it.
    #[error("store version {current} does not match the CAS base version")]
    VersionMismatch {
        current: ConfigVersion,
        stored: Option<Vec<u8>>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Compare-and-swap store keyed on the configuration version.
#[async_trait]
pub trait ConfigStore: Send + Sync + 'static {
    /// Fetch the newest serialized configuration; `None` if the store is
    /// empty. `consistent` requests a linearizable read where the store
    /// distinguishes (a storage member bootstrapping with no local config
    /// asks for one).
    async fn read(&self, consistent: bool) -> Result<Option<Vec<u8>>, StoreError>;

    /// CAS write: succeeds iff the store's current version equals
    /// `base_version`. Returns the version now stored.
    async fn update_config(
        &self,
        serialized: Vec<u8>,
        base_version: ConfigVersion,
    ) -> Result<ConfigVersion, CasError>;

    /// Unconditional write; the tooling path. Returns the version now
    /// stored.
    async fn overwrite(&self, serialized: Vec<u8>) -> Result<ConfigVersion, StoreError>;
}
