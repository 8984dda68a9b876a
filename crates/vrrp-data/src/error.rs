//! Build-phase errors.

use thiserror::Error;

/// Errors raised while building or indexing a configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("duplicate VRRP instance '{0}'")]
    DuplicateInstance(String),

    #[error("duplicate VRRP sync group '{0}'")]
    DuplicateSyncGroup(String),

    #[error("'{directive}' used before any {scope} was declared")]
    NoCurrentTarget {
        directive: String,
        scope: &'static str,
    },

    #[error("invalid '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    #[error("unknown interface '{0}'")]
    UnknownInterface(String),

    #[error("sync group '{group}' monitors unknown instance '{instance}'")]
    UnknownInstance { group: String, instance: String },

    #[error("sync group '{group}' lists '{instance}', already in sync group '{owner}'")]
    AlreadyGrouped {
        group: String,
        instance: String,
        owner: String,
    },

    #[error("{index} key {key} out of range (bucket count {bucket_count})")]
    KeyOutOfRange {
        index: &'static str,
        key: usize,
        bucket_count: usize,
    },
}

impl BuildError {
    pub(crate) fn invalid(directive: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::InvalidDirective {
            directive: directive.into(),
            reason: reason.into(),
        }
    }

    /// Name of the directive that triggered the error, when known.
    pub fn directive(&self) -> Option<&str> {
        match self {
            BuildError::NoCurrentTarget { directive, .. }
            | BuildError::InvalidDirective { directive, .. } => Some(directive),
            BuildError::UnknownInstance { .. } | BuildError::AlreadyGrouped { .. } => Some("group"),
            _ => None,
        }
    }
}

impl From<BuildError> for common::Error {
    fn from(err: BuildError) -> Self {
        common::Error::config(err)
    }
}

/// A specialized Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
