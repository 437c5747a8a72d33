//! Version errors
//!
//! All of these are caller input errors and are never retried.

use thiserror::Error;

/// Version rationalization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// Orchestrator name is not known
    #[error("unsupported orchestrator: {orchestrator}")]
    UnsupportedOrchestrator {
        /// Name as supplied
        orchestrator: String,
    },

    /// String does not parse as a semantic version or release
    #[error("invalid version '{version}': {message}")]
    InvalidVersion {
        /// Offending string
        version: String,
        /// Parser message
        message: String,
    },

    /// No supported version matches the request
    #[error("no supported {orchestrator} version for release '{release}' and version '{version}'")]
    UnsupportedVersion {
        /// Orchestrator the request was for
        orchestrator: String,
        /// Requested release (may be empty)
        release: String,
        /// Requested version (may be empty)
        version: String,
    },
}

impl VersionError {
    pub(crate) fn invalid(version: &str, message: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for version operations
pub type Result<T> = std::result::Result<T, VersionError>;
