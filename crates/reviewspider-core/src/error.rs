use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;

/// Every failure that leaves the crate, categorized by what the caller can do about it.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The primary store could not be reached or refused an operation.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable { backend: &'static str, reason: String },

    #[error("browser operation `{operation}` failed for {target}: {reason}")]
    Browser {
        operation: &'static str,
        target: String,
        reason: String,
    },

    #[error("markup error during `{operation}`: {reason}")]
    Markup { operation: &'static str, reason: String },

    #[error("local store failed for `{key}`: {reason}")]
    LocalStore { key: String, reason: String },

    #[error("`{operation}` timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },
}

impl ReviewError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn unavailable(backend: &'static str, reason: impl Display) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn browser(operation: &'static str, target: impl Into<String>, reason: impl Display) -> Self {
        Self::Browser {
            operation,
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn markup(operation: &'static str, reason: impl Display) -> Self {
        Self::Markup {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn local_store(key: impl Into<String>, reason: impl Display) -> Self {
        Self::LocalStore {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
