//! Error types for the health-incidents crate.

use thiserror::Error;

/// Errors that can occur while building, enriching or paging incidents.
#[derive(Debug, Error)]
pub enum IncidentError {
    /// A severity name could not be parsed.
    #[error("invalid severity: {value}")]
    InvalidSeverity {
        /// The rejected severity name.
        value: String,
    },

    /// A pagination cursor was malformed or inconsistent.
    #[error("invalid pagination cursor: {reason}")]
    InvalidCursor {
        /// The reason the cursor was rejected.
        reason: String,
    },

    /// A stored RFC3339 timestamp could not be parsed.
    #[error("failed to parse {field} '{value}': {reason}")]
    InvalidTimestamp {
        /// Which incident field held the timestamp.
        field: &'static str,
        /// The raw stored value.
        value: String,
        /// The underlying parse failure.
        reason: String,
    },

    /// A query result did not have the expected shape.
    #[error("unexpected data shape: {reason}")]
    UnexpectedShape {
        /// What was wrong with the data.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for IncidentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for incident operations.
pub type Result<T> = std::result::Result<T, IncidentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_severity() {
        let err = IncidentError::InvalidSeverity {
            value: "urgent".to_string(),
        };
        assert_eq!(err.to_string(), "invalid severity: urgent");
    }

    #[test]
    fn error_display_invalid_cursor() {
        let err = IncidentError::InvalidCursor {
            reason: "not base64".to_string(),
        };
        assert_eq!(err.to_string(), "invalid pagination cursor: not base64");
    }

    #[test]
    fn error_display_invalid_timestamp() {
        let err = IncidentError::InvalidTimestamp {
            field: "start_time",
            value: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse start_time 'yesterday': input contains invalid characters"
        );
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let err: IncidentError = json_err.unwrap_err().into();
        assert!(matches!(err, IncidentError::Serialization(_)));
    }
}
