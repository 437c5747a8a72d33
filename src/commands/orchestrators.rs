//! Orchestrators command

use clap::Args;
use keel_common::OrchestratorType;
use keel_versions::{orchestrator_version_profiles, parse_orchestrator};
use serde_json::Value;

use crate::Result;

#[derive(Args, Debug)]
pub struct OrchestratorsArgs {
    /// Orchestrator to list (all orchestrators if not specified)
    #[arg(long)]
    pub orchestrator: Option<String>,

    /// Limit the listing to one release, e.g. 1.10
    #[arg(long, requires = "orchestrator")]
    pub release: Option<String>,

    /// Only list versions that support Windows agent pools
    #[arg(long)]
    pub windows: bool,
}

pub fn run(args: OrchestratorsArgs) -> Result<Value> {
    let orchestrators = match &args.orchestrator {
        Some(name) => vec![parse_orchestrator(name)?],
        None => OrchestratorType::ALL.to_vec(),
    };

    let mut profiles = Vec::new();
    for orchestrator in orchestrators {
        profiles.extend(orchestrator_version_profiles(
            orchestrator,
            args.release.as_deref(),
            args.windows,
        )?);
    }

    Ok(serde_json::json!({ "orchestrators": serde_json::to_value(profiles)? }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(orchestrator: Option<&str>, release: Option<&str>) -> OrchestratorsArgs {
        OrchestratorsArgs {
            orchestrator: orchestrator.map(str::to_string),
            release: release.map(str::to_string),
            windows: false,
        }
    }

    #[test]
    fn lists_every_orchestrator_by_default() {
        let output = run(args(None, None)).expect("listing should succeed");
        let profiles = output["orchestrators"].as_array().expect("orchestrators array");

        for name in ["Kubernetes", "DCOS", "Swarm", "DockerCE", "OpenShift"] {
            assert!(
                profiles.iter().any(|p| p["orchestratorType"] == name),
                "missing {}",
                name
            );
        }
    }

    #[test]
    fn release_filter_keeps_one_minor() {
        let output = run(args(Some("kubernetes"), Some("1.9"))).expect("listing should succeed");
        let profiles = output["orchestrators"].as_array().expect("orchestrators array");

        assert!(!profiles.is_empty());
        for profile in profiles {
            let version = profile["orchestratorVersion"].as_str().expect("version string");
            assert!(version.starts_with("1.9."), "{} is not 1.9.x", version);
        }
    }

    #[test]
    fn unknown_orchestrator_is_rejected() {
        let err = run(args(Some("nomad"), None)).expect_err("nomad should be rejected");
        assert!(err.to_string().contains("nomad"));
    }
}
