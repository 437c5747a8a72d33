//! Upgrade paths between Kubernetes releases

use keel_common::OrchestratorType;
use serde::Serialize;

use crate::rationalize::{latest_patch, parse_version, release_of};
use crate::tables::{default_version, fixed_version, supported_versions};
use crate::Result;

/// Release -> releases a cluster may upgrade to
const UPGRADE_PATHS: &[(&str, &[&str])] = &[
    ("1.5", &["1.6"]),
    ("1.6", &["1.7"]),
    ("1.7", &["1.8"]),
    ("1.8", &["1.9"]),
    ("1.9", &["1.10"]),
    ("1.10", &["1.11"]),
];

/// Releases reachable as upgrade targets from `release`
pub fn upgrade_releases(release: &str) -> &'static [&'static str] {
    let release = release.trim_start_matches('v');
    UPGRADE_PATHS
        .iter()
        .find(|(from, _)| *from == release)
        .map(|(_, to)| *to)
        .unwrap_or(&[])
}

/// Concrete Kubernetes versions a cluster at `current` may upgrade to
///
/// The newest patch of the current release is offered when it is newer than
/// `current`, followed by the newest patch of every reachable release.
pub fn upgrade_targets(current: &str, has_windows: bool) -> Result<Vec<String>> {
    let parsed = parse_version(current)?;
    let release = release_of(current)?;
    let supported = supported_versions(OrchestratorType::Kubernetes, false, has_windows);

    let mut targets = Vec::new();
    if let Some(patch) = latest_patch(&release, &supported)? {
        if parse_version(&patch)? > parsed {
            targets.push(patch);
        }
    }
    for next in upgrade_releases(&release) {
        if let Some(version) = latest_patch(next, &supported)? {
            targets.push(version);
        }
    }
    Ok(targets)
}

/// A supported version with its default marker and upgrade targets
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorVersionProfile {
    /// Orchestrator type
    pub orchestrator_type: OrchestratorType,
    /// Version
    pub orchestrator_version: String,
    /// New clusters get this version by default
    pub default: bool,
    /// Versions this one can upgrade to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub upgrades: Vec<String>,
}

/// Every version available for new clusters, optionally limited to one release
pub fn orchestrator_version_profiles(
    orchestrator: OrchestratorType,
    release: Option<&str>,
    has_windows: bool,
) -> Result<Vec<OrchestratorVersionProfile>> {
    let default = default_version(orchestrator, has_windows)?;
    let semantic = fixed_version(orchestrator).is_none();

    let mut profiles = Vec::new();
    for version in supported_versions(orchestrator, false, has_windows) {
        if let (Some(release), true) = (release, semantic) {
            if release_of(version)? != release.trim_start_matches('v') {
                continue;
            }
        }
        let upgrades = if orchestrator == OrchestratorType::Kubernetes {
            upgrade_targets(version, has_windows)?
        } else {
            Vec::new()
        };
        profiles.push(OrchestratorVersionProfile {
            orchestrator_type: orchestrator,
            orchestrator_version: version.to_string(),
            default: version == default,
            upgrades,
        });
    }
    Ok(profiles)
}
