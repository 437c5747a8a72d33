//! Scale command

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use keel_graph::{normalize_for_availability_set_scale_up, normalize_for_scale_set};
use serde_json::Value;

use super::read_graph;
use crate::Result;

/// How the agent pool being scaled is deployed
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScaleMode {
    /// Virtual machine scale set
    ScaleSet,
    /// Individual VMs in an availability set
    AvailabilitySet,
}

#[derive(Args, Debug)]
pub struct ScaleArgs {
    /// Rendered deployment template JSON file
    pub template: PathBuf,

    /// Deployment style of the pool being scaled
    #[arg(long, value_enum)]
    pub mode: ScaleMode,
}

pub fn run(args: ScaleArgs) -> Result<Value> {
    let mut graph = read_graph(&args.template)?;
    match args.mode {
        ScaleMode::ScaleSet => normalize_for_scale_set(&mut graph)?,
        ScaleMode::AvailabilitySet => normalize_for_availability_set_scale_up(&mut graph)?,
    }
    Ok(graph.to_value())
}
