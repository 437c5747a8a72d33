//! SSH key generation for node login

use rcgen::PublicKeyData;
use base64::Engine;
use serde::Serialize;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;
use zeroize::Zeroizing;

use crate::ca::generate_rsa_key;
use crate::error::{PkiError, Result};

const SSH_RSA: &str = "ssh-rsa";

/// RSA key pair for node login
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyPair {
    /// PKCS#8 PEM private key
    #[serde(serialize_with = "crate::serialize_secret")]
    pub private_key_pem: Zeroizing<String>,
    /// OpenSSH authorized_keys line
    pub authorized_key: String,
}

impl std::fmt::Debug for SshKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshKeyPair")
            .field("private_key_pem", &"<redacted>")
            .field("authorized_key", &self.authorized_key)
            .finish()
    }
}

/// Generate a 4096-bit RSA key pair with its authorized key line
pub fn generate_ssh_key() -> Result<SshKeyPair> {
    let key_pair = generate_rsa_key("SSH")?;
    let private_key_pem = Zeroizing::new(key_pair.serialize_pem());

    let spki = key_pair.subject_public_key_info();
    let (_, info) = SubjectPublicKeyInfo::from_der(&spki)
        .map_err(|e| PkiError::ParseError(format!("failed to parse SSH public key: {}", e)))?;
    let rsa = match info.parsed() {
        Ok(PublicKey::RSA(rsa)) => rsa,
        Ok(_) => {
            return Err(PkiError::KeyGenerationFailed(
                "SSH key is not an RSA key".to_string(),
            ))
        }
        Err(e) => {
            return Err(PkiError::ParseError(format!(
                "failed to decode SSH public key: {}",
                e
            )))
        }
    };

    Ok(SshKeyPair {
        private_key_pem,
        authorized_key: authorized_key(rsa.exponent, rsa.modulus),
    })
}

/// Render an `ssh-rsa` authorized key line from the big-endian exponent and modulus
fn authorized_key(exponent: &[u8], modulus: &[u8]) -> String {
    let mut blob = Vec::with_capacity(modulus.len() + 32);
    write_string(&mut blob, SSH_RSA.as_bytes());
    write_mpint(&mut blob, exponent);
    write_mpint(&mut blob, modulus);
    format!(
        "{} {}",
        SSH_RSA,
        base64::engine::general_purpose::STANDARD.encode(blob)
    )
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Positive multiple-precision integer: no redundant leading zeros, and a
/// zero byte prepended when the high bit is set
fn write_mpint(out: &mut Vec<u8>, bytes: &[u8]) {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.first().is_some_and(|b| b & 0x80 != 0) {
        out.extend_from_slice(&((trimmed.len() + 1) as u32).to_be_bytes());
        out.push(0);
    } else {
        out.extend_from_slice(&(trimmed.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(trimmed);
}
