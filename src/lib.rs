//! keel - cluster definition engine
//!
//! Turns a versioned cluster definition into resolved component
//! configuration, a PKI trust hierarchy, and lifecycle-safe rewrites of an
//! already rendered deployment template.
//!
//! # Crates
//!
//! - [`keel_common`] - cluster-definition model, engine configuration, logging
//! - [`keel_versions`] - version rationalization and upgrade paths
//! - [`keel_config`] - component flag and addon resolution
//! - [`keel_pki`] - certificate hierarchy and SSH key generation
//! - [`keel_graph`] - deployment template transforms

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use keel_common::telemetry::LogFormat;
use keel_common::EngineConfig;

/// keel - resolve, secure, and scale Kubernetes cluster definitions
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (falls back to KEEL_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log format as accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable lines
    Text,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// keel subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported orchestrator versions and their upgrade paths
    Orchestrators(commands::orchestrators::OrchestratorsArgs),
    /// Resolve component flags and addons for a cluster definition
    Resolve(commands::resolve::ResolveArgs),
    /// Generate the certificate hierarchy for a cluster definition
    Pki(commands::pki::PkiArgs),
    /// Generate an SSH key pair for node login
    SshKey,
    /// Normalize a deployment template for a scale operation
    Scale(commands::scale::ScaleArgs),
    /// Normalize a deployment template for an upgrade
    Upgrade(commands::upgrade::UpgradeArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let engine = EngineConfig::load(self.config.as_deref())?;

        let output = match self.command {
            Commands::Orchestrators(args) => commands::orchestrators::run(args)?,
            Commands::Resolve(args) => commands::resolve::run(args, &engine)?,
            Commands::Pki(args) => commands::pki::run(args, &engine).await?,
            Commands::SshKey => commands::ssh_key::run().await?,
            Commands::Scale(args) => commands::scale::run(args)?,
            Commands::Upgrade(args) => commands::upgrade::run(args)?,
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
