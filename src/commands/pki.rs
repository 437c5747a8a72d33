//! PKI command

use std::path::PathBuf;

use clap::Args;
use keel_common::EngineConfig;
use keel_pki::{generate_pki, CaSource, PkiRequest};
use serde_json::Value;
use tracing::info;
use zeroize::Zeroizing;

use super::{read_definition, read_file};
use crate::Result;

#[derive(Args, Debug)]
pub struct PkiArgs {
    /// Cluster definition JSON file
    pub definition: PathBuf,

    /// PEM CA certificate to sign with instead of generating one
    #[arg(long, requires = "ca_key")]
    pub ca_cert: Option<PathBuf>,

    /// PEM private key of the CA given with --ca-cert
    #[arg(long, requires = "ca_cert")]
    pub ca_key: Option<PathBuf>,
}

pub async fn run(args: PkiArgs, engine: &EngineConfig) -> Result<Value> {
    let definition = read_definition(&args.definition)?;
    let mut request = PkiRequest::for_cluster(&definition, &engine.cluster_domain)?;

    if let (Some(cert), Some(key)) = (&args.ca_cert, &args.ca_key) {
        info!(ca_cert = %cert.display(), "signing with supplied CA");
        request.ca = CaSource::Supplied {
            certificate_pem: read_file(cert)?,
            private_key_pem: Zeroizing::new(read_file(key)?),
        };
        // Leaves from the definition were signed by its own CA
        request.supplied_leaves.clear();
    }

    let bundle = generate_pki(request).await?;
    Ok(serde_json::to_value(&bundle)?)
}
