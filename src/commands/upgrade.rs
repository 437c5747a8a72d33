//! Upgrade command

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use keel_graph::{normalize_for_agent_upgrade, normalize_for_master_upgrade, UpgradeOptions};
use serde_json::Value;

use super::read_graph;
use crate::Result;

/// Nodes being upgraded
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum UpgradeRole {
    /// Master nodes
    Master,
    /// Agent nodes
    Agent,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Rendered deployment template JSON file
    pub template: PathBuf,

    /// Which nodes are being upgraded
    #[arg(long, value_enum)]
    pub role: UpgradeRole,

    /// Agent pool to keep in the template (repeatable)
    #[arg(long = "preserve-pool")]
    pub preserve_pools: Vec<String>,

    /// Masters use managed disks
    #[arg(long)]
    pub managed_disk: bool,
}

impl UpgradeArgs {
    fn options(&self) -> UpgradeOptions {
        UpgradeOptions {
            managed_disk: self.managed_disk,
            pools_to_preserve: (!self.preserve_pools.is_empty())
                .then(|| self.preserve_pools.iter().cloned().collect()),
        }
    }
}

pub fn run(args: UpgradeArgs) -> Result<Value> {
    let mut graph = read_graph(&args.template)?;
    let options = args.options();
    match args.role {
        UpgradeRole::Master => normalize_for_master_upgrade(&mut graph, &options)?,
        UpgradeRole::Agent => normalize_for_agent_upgrade(&mut graph, &options)?,
    }
    Ok(graph.to_value())
}
