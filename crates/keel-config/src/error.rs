//! Configuration resolution errors

use keel_versions::VersionError;
use thiserror::Error;

/// Errors raised while resolving a cluster's configuration
///
/// Flag and addon resolution themselves are total; failures come from the
/// version request or an orchestrator without component configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested version could not be rationalized
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Component configuration only exists for Kubernetes
    #[error("component configuration is only available for Kubernetes, not {orchestrator}")]
    UnsupportedOrchestrator {
        /// Orchestrator of the cluster definition
        orchestrator: String,
    },
}

/// Result type for configuration resolution
pub type Result<T> = std::result::Result<T, ConfigError>;
