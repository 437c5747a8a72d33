//! Supported orchestrator versions
//!
//! Each entry pairs a version with whether new clusters may be created at it.
//! Versions that are only `false` remain valid upgrade sources.

use keel_common::OrchestratorType;

use crate::rationalize::latest_patch;
use crate::{Result, VersionError};

/// Release new Kubernetes clusters default to
pub const KUBERNETES_DEFAULT_RELEASE: &str = "1.8";

const KUBERNETES_VERSIONS: &[(&str, bool)] = &[
    ("1.6.6", false),
    ("1.6.9", true),
    ("1.6.11", true),
    ("1.6.12", true),
    ("1.6.13", true),
    ("1.7.0", false),
    ("1.7.1", false),
    ("1.7.2", true),
    ("1.7.4", true),
    ("1.7.5", true),
    ("1.7.7", true),
    ("1.7.9", true),
    ("1.7.10", true),
    ("1.7.12", true),
    ("1.7.13", true),
    ("1.7.14", true),
    ("1.7.15", true),
    ("1.7.16", true),
    ("1.8.0", false),
    ("1.8.1", true),
    ("1.8.2", true),
    ("1.8.4", true),
    ("1.8.6", true),
    ("1.8.7", true),
    ("1.8.8", true),
    ("1.8.9", true),
    ("1.8.10", true),
    ("1.8.11", true),
    ("1.8.12", true),
    ("1.8.13", true),
    ("1.8.14", true),
    ("1.8.15", true),
    ("1.9.0", true),
    ("1.9.1", true),
    ("1.9.2", true),
    ("1.9.3", true),
    ("1.9.4", true),
    ("1.9.5", true),
    ("1.9.6", true),
    ("1.9.7", true),
    ("1.9.8", true),
    ("1.9.9", true),
    ("1.9.10", true),
    ("1.10.0-beta.2", false),
    ("1.10.0-beta.4", false),
    ("1.10.0-rc.1", false),
    ("1.10.0", true),
    ("1.10.1", true),
    ("1.10.2", true),
    ("1.10.3", true),
    ("1.10.4", true),
    ("1.10.5", true),
    ("1.10.6", true),
    ("1.10.7", true),
    ("1.10.8", true),
    ("1.11.0", true),
    ("1.11.1", true),
    ("1.11.2", true),
    ("1.11.3", true),
];

/// Kubernetes versions that never shipped Windows node support
fn windows_excluded(version: &str) -> bool {
    version.starts_with("1.6.") || version == "1.7.0" || version == "1.7.1" || version.contains('-')
}

const DCOS_VERSIONS: &[(&str, bool)] = &[
    ("1.8.8", true),
    ("1.9.0", true),
    ("1.9.8", true),
    ("1.10.0", true),
    ("1.11.0", true),
];

const DCOS_DEFAULT_VERSION: &str = "1.11.0";

const OPENSHIFT_VERSIONS: &[(&str, bool)] = &[("3.9.0", true)];

const OPENSHIFT_DEFAULT_VERSION: &str = "3.9.0";

const SWARM_VERSION: &str = "swarm:1.1.0";

const DOCKER_CE_VERSION: &str = "17.03.*";

/// Version of orchestrators that ship a single fixed, non-semver version
pub(crate) fn fixed_version(orchestrator: OrchestratorType) -> Option<&'static str> {
    match orchestrator {
        OrchestratorType::Swarm => Some(SWARM_VERSION),
        OrchestratorType::DockerCe => Some(DOCKER_CE_VERSION),
        _ => None,
    }
}

/// Versions accepted for an orchestrator
///
/// Creation only admits versions marked available; updates admit every listed
/// version. Clusters with Windows pools exclude versions without Windows support.
pub fn supported_versions(
    orchestrator: OrchestratorType,
    is_update: bool,
    has_windows: bool,
) -> Vec<&'static str> {
    if let Some(fixed) = fixed_version(orchestrator) {
        return vec![fixed];
    }

    let table = match orchestrator {
        OrchestratorType::Kubernetes => KUBERNETES_VERSIONS,
        OrchestratorType::Dcos => DCOS_VERSIONS,
        OrchestratorType::OpenShift => OPENSHIFT_VERSIONS,
        OrchestratorType::Swarm | OrchestratorType::DockerCe => &[],
    };

    table
        .iter()
        .filter(|(_, for_create)| is_update || *for_create)
        .map(|(version, _)| *version)
        .filter(|version| {
            !(has_windows && orchestrator == OrchestratorType::Kubernetes && windows_excluded(version))
        })
        .collect()
}

/// Version new clusters get when neither release nor version is requested
pub fn default_version(orchestrator: OrchestratorType, has_windows: bool) -> Result<String> {
    match orchestrator {
        OrchestratorType::Kubernetes => {
            let versions = supported_versions(orchestrator, false, has_windows);
            latest_patch(KUBERNETES_DEFAULT_RELEASE, &versions)?.ok_or_else(|| {
                VersionError::UnsupportedVersion {
                    orchestrator: orchestrator.to_string(),
                    release: KUBERNETES_DEFAULT_RELEASE.to_string(),
                    version: String::new(),
                }
            })
        }
        OrchestratorType::Dcos => Ok(DCOS_DEFAULT_VERSION.to_string()),
        OrchestratorType::OpenShift => Ok(OPENSHIFT_DEFAULT_VERSION.to_string()),
        OrchestratorType::Swarm => Ok(SWARM_VERSION.to_string()),
        OrchestratorType::DockerCe => Ok(DOCKER_CE_VERSION.to_string()),
    }
}
