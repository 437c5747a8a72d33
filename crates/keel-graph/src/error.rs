//! Error types for deployment graph transforms

use thiserror::Error;

/// Errors raised while loading or transforming a deployment graph
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// The document is not a template with a `resources` array
    #[error("malformed deployment graph: {message}")]
    Malformed {
        /// What is wrong with the document
        message: String,
    },

    /// Scale-up requires exactly one network security group
    #[error("found {count} resources of type {resource_type}, expected exactly 1")]
    UnexpectedNsgCount {
        /// Number of network security groups found
        count: usize,
        /// Resource type that was counted
        resource_type: &'static str,
    },

    /// JSON (de)serialization failed
    #[error("graph serialization error: {message}")]
    Serialization {
        /// Serializer message
        message: String,
    },
}

impl GraphError {
    /// Create a malformed-document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
            message: msg.into(),
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
