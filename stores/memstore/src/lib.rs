#![deny(unused_crate_dependencies)]
#![deny(unused_qualifications)]

//! An in-memory [`ConfigStore`] used by the test suite and by examples.
//!
//! One `MemConfigStore` plays the role of the shared external store: CAS
//! semantics are provided by a process-local mutex instead of a consensus
//! service. Test-only knobs allow seeding the stored blob, injecting
//! failures and delaying writes.


use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use nodecfg::AnyError;
use nodecfg::CasError;
use nodecfg::ConfigCodec;
use nodecfg::ConfigStore;
use nodecfg::ConfigVersion;
use nodecfg::JsonCodec;
use nodecfg::StoreError;

#[derive(Debug, Default)]
struct StoreState {
    version: ConfigVersion,
    data: Option<Vec<u8>>,
}

/// In-memory compare-and-swap configuration store.
///
/// Blobs are framed with [`JsonCodec`]; the store reads the version header
/// of every write so CAS can be keyed on it, exactly like a production
/// store would.
#[derive(Debug, Default)]
pub struct MemConfigStore {
    state: Mutex<StoreState>,

    /// Error returned by the next write.
    fail_next: Mutex<Option<StoreError>>,

    /// Artificial latency applied to writes.
    write_delay: Mutex<Option<Duration>>,
}

impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored blob directly, bypassing CAS. Emulates another
    /// proposer having won a race.
    pub fn seed(&self, version: ConfigVersion, data: Vec<u8>) {
        let mut state = self.lock_state();
        state.version = version;
        state.data = Some(data);
    }

    /// The currently stored version and blob.
    pub fn current(&self) -> (ConfigVersion, Option<Vec<u8>>) {
        let state = self.lock_state();
        (state.version, state.data.clone())
    }

    /// Make the next write fail with `err`.
    pub fn fail_next_write(&self, err: StoreError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// Delay every write by `delay`.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_injected_failure(&self) -> Option<StoreError> {
        self.fail_next.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    async fn apply_write_delay(&self) {
        let delay = *self.write_delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ConfigStore for MemConfigStore {
    async fn read(&self, _consistent: bool) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock_state().data.clone())
    }

    async fn update_config(
        &self,
        serialized: Vec<u8>,
        base_version: ConfigVersion,
    ) -> Result<ConfigVersion, CasError> {
        self.apply_write_delay().await;
        if let Some(err) = self.take_injected_failure() {
            return Err(CasError::Store(err));
        }

        let new_version = JsonCodec::extract_config_version(&serialized)
            .map_err(|e| CasError::Store(StoreError::InvalidParam(AnyError::new(&e))))?;

        let mut state = self.lock_state();
        if state.version != base_version {
            return Err(CasError::VersionMismatch {
                current: state.version,
                stored: state.data.clone(),
            });
        }
        state.version = new_version;
        state.data = Some(serialized);
        Ok(new_version)
    }

    async fn overwrite(&self, serialized: Vec<u8>) -> Result<ConfigVersion, StoreError> {
        self.apply_write_delay().await;
        if let Some(err) = self.take_injected_failure() {
            return Err(err);
        }

        let new_version = JsonCodec::extract_config_version(&serialized)
            .map_err(|e| StoreError::InvalidParam(AnyError::new(&e)))?;

        let mut state = self.lock_state();
        state.version = new_version;
        state.data = Some(serialized);
        Ok(new_version)
    }
}
