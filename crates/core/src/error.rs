//! Error types for ci-lifecycle
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the lifecycle core
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Malformed caller input. The message is surfaced verbatim.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("State {0} was not saved by the setup phase")]
    MissingState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

impl LifecycleError {
    /// Caller mistakes are reported immediately and never retried.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::InvalidArgument(_)
                | LifecycleError::MissingInput(_)
                | LifecycleError::MissingState(_)
        )
    }
}
