//! Error types for the get_incidents tool.

use health_incidents::IncidentError;
use thiserror::Error;

/// Errors that fail a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The request carried no authorization header.
    #[error("missing authorization header: {header}")]
    MissingToken {
        /// The expected header name.
        header: &'static str,
    },

    /// The authorization header is not a usable bearer credential.
    #[error("invalid authorization token: {reason}")]
    InvalidToken {
        /// What was wrong with the header value.
        reason: String,
    },

    /// A tool parameter was out of range or malformed.
    #[error("invalid parameter {param}: {reason}")]
    InvalidParams {
        /// The offending parameter.
        param: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A backend request failed.
    #[error("{backend} request failed: {reason}")]
    Backend {
        /// Which backend was queried.
        backend: &'static str,
        /// The underlying failure.
        reason: String,
    },

    /// A backend answered with data of the wrong shape.
    #[error("unexpected {backend} response: {reason}")]
    UnexpectedShape {
        /// Which backend answered.
        backend: &'static str,
        /// What was wrong with the answer.
        reason: String,
    },

    /// The request did not finish within the query timeout.
    #[error("request timed out after {secs}s")]
    Timeout {
        /// The timeout that elapsed.
        secs: u64,
    },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Incident processing failed.
    #[error(transparent)]
    Incident(#[from] IncidentError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ToolError {
    /// Creates a backend error.
    pub fn backend(backend: &'static str, reason: impl ToString) -> Self {
        Self::Backend {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Creates a shape error.
    pub fn shape(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            backend,
            reason: reason.into(),
        }
    }

    /// Returns true if the error came from the caller's input rather than a
    /// backend or the environment.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::MissingToken { .. }
                | Self::InvalidToken { .. }
                | Self::InvalidParams { .. }
                | Self::Incident(
                    IncidentError::InvalidCursor { .. } | IncidentError::InvalidSeverity { .. }
                )
        )
    }
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;
