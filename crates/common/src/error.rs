//! Common error types for Seesaw Rust components.

use std::fmt;

/// A specialized Result type for Seesaw operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for Seesaw operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the error stems from configuration data rather than the
    /// environment.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Yaml(_))
    }
}
