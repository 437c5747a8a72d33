//! CLI commands
//!
//! Each command returns its result as JSON; [`crate::Cli::run`] prints it.

use std::path::Path;

use keel_common::ClusterDefinition;
use keel_graph::DeploymentGraph;
use tracing::debug;

use crate::{Error, Result};

pub mod orchestrators;
pub mod pki;
pub mod resolve;
pub mod scale;
pub mod ssh_key;
pub mod upgrade;

/// Read a file into a string, naming the path on failure
pub(crate) fn read_file(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "reading input");
    std::fs::read_to_string(path).map_err(|e| Error::read(path, e))
}

/// Load a cluster definition document
pub(crate) fn read_definition(path: &Path) -> Result<ClusterDefinition> {
    Ok(ClusterDefinition::from_json(&read_file(path)?)?)
}

/// Load a rendered deployment template
pub(crate) fn read_graph(path: &Path) -> Result<DeploymentGraph> {
    Ok(DeploymentGraph::from_json(&read_file(path)?)?)
}
