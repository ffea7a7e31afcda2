use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Version of a nodes configuration.
///
/// Versions are totally ordered. [`ConfigVersion::EMPTY`] is the version of a
/// configuration that has never been written to the store; it sorts below
/// every real version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct ConfigVersion(u64);

impl ConfigVersion {
    /// The version of a configuration that does not exist yet.
    pub const EMPTY: ConfigVersion = ConfigVersion(0);

    pub fn new(version: u64) -> Self {
        ConfigVersion(version)
    }

    pub fn val(&self) -> u64 {
        self.0
    }

    /// The next version.
    pub fn succ(&self) -> Self {
        ConfigVersion(self.0 + 1)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
