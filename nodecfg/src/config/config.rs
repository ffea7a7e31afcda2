//! NCM runtime configuration.

use std::time::Duration;

use clap::Parser;

use crate::config::ConfigError;

/// Runtime configuration of an NCM instance.
///
/// Create a configuration, optionally customize fields, validate it, and
/// pass it to [`NodesConfigManager::new`]:
///
/// ```ignore
/// let config = Config {
///     cluster_name: "logs.frc".to_string(),
///     heartbeat_interval: 1000,
///     ..Default::default()
/// };
/// let config = Arc::new(config.validate()?);
/// ```
///
/// [`NodesConfigManager::new`]: crate::manager::NodesConfigManager::new
#[derive(Clone, Debug, Parser, PartialEq)]
pub struct Config {
    /// The application-specific name of this cluster
    #[clap(long, default_value = "foo")]
    pub cluster_name: String,

    /// Interval between heartbeat polls of the configuration store, in
    /// milliseconds
    #[clap(long, default_value = "3000")]
    pub heartbeat_interval: u64,

    /// Upper bound for blocking on initialization, in milliseconds
    #[clap(long, default_value = "10000")]
    pub init_timeout: u64,

    /// How long a shard may sit in an intermediary storage state before a
    /// proposer forces it onward, in seconds. 0 forces shards onward on the
    /// next heartbeat.
    #[clap(long, default_value = "7200")]
    pub intermediary_shard_state_timeout: u64,

    /// Enable or disable the heartbeat tick.
    ///
    /// With ticking disabled the instance never polls the store on its own;
    /// it only learns of new configurations through pushed notifications.
    /// Mainly used for testing.
    // clap 4 requires `num_args = 0..=1`, or it complains about missing arg error
    #[clap(long,
           default_value_t = true,
           action = clap::ArgAction::Set,
           num_args = 0..=1,
           default_missing_value = "true"
    )]
    pub enable_tick: bool,

    /// Whether this instance runs inside a server process. Enables the
    /// heartbeat consistency reporter; clients leave it off.
    #[clap(long,
           default_value_t = false,
           action = clap::ArgAction::Set,
           num_args = 0..=1,
           default_missing_value = "true"
    )]
    pub server: bool,
}

impl Default for Config {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl Config {
    /// Validate the state of this config.
    pub fn validate(self) -> Result<Config, ConfigError> {
        if self.heartbeat_interval == 0 {
            return Err(ConfigError::ZeroValue { field: "heartbeat_interval" });
        }
        if self.init_timeout == 0 {
            return Err(ConfigError::ZeroValue { field: "init_timeout" });
        }
        Ok(self)
    }

    pub(crate) fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub(crate) fn init_wait(&self) -> Duration {
        Duration::from_millis(self.init_timeout)
    }

    pub(crate) fn intermediary_timeout(&self) -> Duration {
        Duration::from_secs(self.intermediary_shard_state_timeout)
    }
}
