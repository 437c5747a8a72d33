//! Error types shared across keel crates
//!
//! Errors carry the field, document or path they refer to so a failure can be
//! traced back to the input that caused it.

use thiserror::Error;

/// Default context value when no specific field is known
pub const UNKNOWN_FIELD: &str = "unknown";

/// Main error type for cluster-definition handling
#[derive(Debug, Error)]
pub enum Error {
    /// A cluster definition field holds an unusable value
    #[error("validation error for {field}: {message}")]
    Validation {
        /// Path of the offending field (e.g., "orchestratorProfile.orchestratorType")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The document kind being processed (if known)
        kind: Option<String>,
    },

    /// Engine configuration could not be loaded
    #[error("configuration error [{path}]: {message}")]
    Config {
        /// File the configuration was read from
        path: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error without field context
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: UNKNOWN_FIELD.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a known document kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a configuration loading error
    pub fn config(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: msg.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
