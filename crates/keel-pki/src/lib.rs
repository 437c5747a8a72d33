//! Cluster PKI for keel
//!
//! Generates the trust hierarchy a cluster needs: a CA, the API server,
//! client and kubeconfig certificates, and the etcd server, client and
//! per-master peer certificates. Also generates the SSH key used for node
//! login, which shares the 4096-bit RSA convention but not the CA.
//!
//! # Security Model
//!
//! - Private keys are held in [`Zeroizing`] buffers and wiped on drop
//! - The CA key is only read while signing, never mutated
//! - Every leaf is verified against the CA before a bundle is returned
//! - A failed run returns an error and no partial bundle

#![deny(missing_docs)]

pub mod ca;
pub mod error;
pub mod generate;
pub mod request;
pub mod ssh;

use serde::{Serialize, Serializer};
use zeroize::Zeroizing;

pub use ca::{certificate_der, CertificateAuthority, LeafProfile, LeafUsage};
pub use error::{PkiError, Result};
pub use generate::{generate_pki, LeafRole, PkiBundle};
pub use request::{cluster_dns_names, supplied_leaves, CaSource, PkiRequest};
pub use ssh::{generate_ssh_key, SshKeyPair};

/// PEM certificate with its PEM private key
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PkiKeyCertPair {
    /// PEM certificate
    pub certificate_pem: String,
    /// PKCS#8 PEM private key
    #[serde(serialize_with = "serialize_secret")]
    pub private_key_pem: Zeroizing<String>,
}

impl std::fmt::Debug for PkiKeyCertPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkiKeyCertPair")
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

pub(crate) fn serialize_secret<S: Serializer>(
    secret: &Zeroizing<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret)
}
