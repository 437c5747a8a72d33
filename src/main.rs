//! keel CLI
//!
//! Resolves, secures, and normalizes Kubernetes cluster definitions.

use clap::Parser;

use keel::{Cli, Result};
use keel_common::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        format: cli.log_format.into(),
        ..Default::default()
    })?;

    cli.run().await
}
