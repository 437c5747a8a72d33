//! PKI error types

use thiserror::Error;

/// PKI errors
#[derive(Debug, Error)]
pub enum PkiError {
    /// Supplied CA material could not be decoded or parsed
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Certificate generation failed
    #[error("certificate generation failed: {0}")]
    CertificateGenerationFailed(String),

    /// A produced certificate does not verify against the CA public key
    #[error("certificate {subject} does not verify against the CA: {reason}")]
    SignatureMismatch {
        /// Common name of the offending certificate
        subject: String,
        /// Verifier message
        reason: String,
    },

    /// A signing task panicked or could not be joined
    #[error("signing task failed: {0}")]
    TaskFailed(String),

    /// Certificate parsing error
    #[error("certificate parsing error: {0}")]
    ParseError(String),
}

/// Result type for PKI operations
pub type Result<T> = std::result::Result<T, PkiError>;

impl From<tokio::task::JoinError> for PkiError {
    fn from(err: tokio::task::JoinError) -> Self {
        PkiError::TaskFailed(err.to_string())
    }
}
