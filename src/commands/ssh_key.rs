//! SSH key command

use keel_pki::{generate_ssh_key, PkiError};
use serde_json::Value;

use crate::Result;

pub async fn run() -> Result<Value> {
    let pair = tokio::task::spawn_blocking(generate_ssh_key)
        .await
        .map_err(PkiError::from)??;
    Ok(serde_json::to_value(&pair)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prints_authorized_key_and_private_key() {
        let output = run().await.expect("key generation should succeed");
        assert!(output["authorizedKey"]
            .as_str()
            .is_some_and(|k| k.starts_with("ssh-rsa ")));
        assert!(output["privateKeyPem"]
            .as_str()
            .is_some_and(|k| k.contains("PRIVATE KEY")));
    }
}
