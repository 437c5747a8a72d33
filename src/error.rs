//! Error types for the keel CLI

use std::path::PathBuf;

use thiserror::Error;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Cluster definition or engine configuration problem
    #[error(transparent)]
    Common(#[from] keel_common::Error),

    /// Version could not be rationalized
    #[error(transparent)]
    Version(#[from] keel_versions::VersionError),

    /// Component configuration could not be resolved
    #[error(transparent)]
    Config(#[from] keel_config::ConfigError),

    /// PKI generation failed
    #[error(transparent)]
    Pki(#[from] keel_pki::PkiError),

    /// Deployment graph transform failed
    #[error(transparent)]
    Graph(#[from] keel_graph::GraphError),

    /// Logging could not be initialized
    #[error(transparent)]
    Telemetry(#[from] keel_common::telemetry::TelemetryError),

    /// An input file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was requested
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Output could not be serialized
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a read error for a path
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Read {
            path: path.into(),
            source,
        }
    }
}
