/// Errors related to the runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than 0")]
    ZeroValue { field: &'static str },
}
