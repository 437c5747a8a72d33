//! Release/version rationalization and semver helpers

use keel_common::OrchestratorType;
use semver::Version;
use tracing::debug;

use crate::tables::{default_version, fixed_version, supported_versions};
use crate::{Result, VersionError};

/// Parse an orchestrator name, case-insensitively
pub fn parse_orchestrator(name: &str) -> Result<OrchestratorType> {
    name.parse::<OrchestratorType>()
        .map_err(|_| VersionError::UnsupportedOrchestrator {
            orchestrator: name.to_string(),
        })
}

/// Parse a version string, tolerating a leading `v` and a missing patch number
///
/// "1.9" parses as 1.9.0; "v1.10.0-rc.1" keeps its pre-release.
pub fn parse_version(version: &str) -> Result<Version> {
    let trimmed = version.trim().trim_start_matches('v');
    let (core, suffix) = match trimmed.find(|c: char| c == '-' || c == '+') {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let candidate = if core.split('.').count() == 2 {
        format!("{core}.0{suffix}")
    } else {
        trimmed.to_string()
    };
    Version::parse(&candidate).map_err(|e| VersionError::invalid(version, e.to_string()))
}

/// Parse a `major.minor` release string
fn parse_release(release: &str) -> Result<(u64, u64)> {
    let trimmed = release.trim().trim_start_matches('v');
    let mut parts = trimmed.split('.');
    let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(VersionError::invalid(release, "expected a major.minor release"));
    };
    let major = major
        .parse()
        .map_err(|_| VersionError::invalid(release, "major is not a number"))?;
    let minor = minor
        .parse()
        .map_err(|_| VersionError::invalid(release, "minor is not a number"))?;
    Ok((major, minor))
}

/// `major.minor` release of a version string
pub fn release_of(version: &str) -> Result<String> {
    let parsed = parse_version(version)?;
    Ok(format!("{}.{}", parsed.major, parsed.minor))
}

/// Semantically highest version sharing `major.minor` with `minor`
///
/// `Ok(None)` means no version of that release exists in `versions`, which is
/// distinct from a malformed input.
pub fn latest_patch<S: AsRef<str>>(minor: &str, versions: &[S]) -> Result<Option<String>> {
    let (major, minor) = parse_release(minor)?;

    let mut latest: Option<(Version, &str)> = None;
    for candidate in versions {
        let candidate = candidate.as_ref();
        let parsed = parse_version(candidate)?;
        if parsed.major != major || parsed.minor != minor {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| parsed > *best) {
            latest = Some((parsed, candidate));
        }
    }

    Ok(latest.map(|(_, raw)| raw.to_string()))
}

/// Resolve a requested release and version to one supported version
///
/// - neither given: the orchestrator's default version
/// - only release: latest patch of that release
/// - only version: the version itself if supported
/// - both: the version if supported and its release equals `release`
pub fn rationalize_release_and_version(
    orchestrator: OrchestratorType,
    release: &str,
    version: &str,
    is_update: bool,
    has_windows: bool,
) -> Result<String> {
    let release = release.trim().trim_start_matches('v');
    let version = version.trim().trim_start_matches('v');
    let unsupported = || VersionError::UnsupportedVersion {
        orchestrator: orchestrator.to_string(),
        release: release.to_string(),
        version: version.to_string(),
    };

    if let Some(fixed) = fixed_version(orchestrator) {
        let matches = |requested: &str| requested.is_empty() || requested == fixed;
        return if matches(release) && matches(version) {
            Ok(fixed.to_string())
        } else {
            Err(unsupported())
        };
    }

    let supported = supported_versions(orchestrator, is_update, has_windows);
    let resolved = match (release.is_empty(), version.is_empty()) {
        (true, true) => Some(default_version(orchestrator, has_windows)?),
        (false, true) => latest_patch(release, &supported)?,
        (true, false) => supported
            .contains(&version)
            .then(|| version.to_string()),
        (false, false) => {
            let (major, minor) = parse_release(release)?;
            let parsed = parse_version(version)?;
            (supported.contains(&version) && parsed.major == major && parsed.minor == minor)
                .then(|| version.to_string())
        }
    };

    let resolved = resolved.ok_or_else(unsupported)?;
    debug!(%orchestrator, release, version, resolved = %resolved, "rationalized orchestrator version");
    Ok(resolved)
}

/// Versions between `min` and `max`, sorted by semantic precedence
///
/// Pre-release versions are skipped unless `include_pre_releases` is set.
pub fn versions_in_range<S: AsRef<str>>(
    versions: &[S],
    min: &str,
    max: &str,
    inclusive: bool,
    include_pre_releases: bool,
) -> Result<Vec<String>> {
    let min = parse_version(min)?;
    let max = parse_version(max)?;

    let mut in_range = Vec::new();
    for candidate in versions {
        let candidate = candidate.as_ref();
        let parsed = parse_version(candidate)?;
        if !parsed.pre.is_empty() && !include_pre_releases {
            continue;
        }
        let within = if inclusive {
            parsed >= min && parsed <= max
        } else {
            parsed > min && parsed < max
        };
        if within {
            in_range.push((parsed, candidate.to_string()));
        }
    }

    in_range.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(in_range.into_iter().map(|(_, raw)| raw).collect())
}

/// True when `actual >= floor`
///
/// The pre-release suffix of `actual` is dropped before comparing, so
/// "1.10.0-rc.1" satisfies a "1.10.0" floor. The floor keeps its suffix.
/// Unparsable input never satisfies a floor.
pub fn is_version_at_least(actual: &str, floor: &str) -> bool {
    let stripped = actual.split('-').next().unwrap_or(actual);
    match (parse_version(stripped), parse_version(floor)) {
        (Ok(actual), Ok(floor)) => actual >= floor,
        (Err(e), _) | (_, Err(e)) => {
            debug!(actual, floor, error = %e, "version comparison on unparsable input");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const NINES: &[&str] = &["1.9.0", "1.9.3", "1.9.6", "1.10.0"];

    // =========================================================================
    // latest_patch
    // =========================================================================

    #[test]
    fn latest_patch_picks_highest_of_release() {
        let latest = latest_patch("1.9", NINES).expect("should succeed");
        assert_eq!(latest.as_deref(), Some("1.9.6"));
    }

    #[test]
    fn latest_patch_orders_semantically_not_lexically() {
        let versions = ["1.8.9", "1.8.10", "1.8.2"];
        let latest = latest_patch("1.8", &versions).expect("should succeed");
        assert_eq!(latest.as_deref(), Some("1.8.10"));
    }

    #[test]
    fn latest_patch_prefers_release_over_prerelease() {
        let versions = ["1.10.0-rc.1", "1.10.0", "1.10.0-beta.4"];
        let latest = latest_patch("1.10", &versions).expect("should succeed");
        assert_eq!(latest.as_deref(), Some("1.10.0"));
    }

    #[test]
    fn latest_patch_none_is_not_an_error() {
        let latest = latest_patch("1.12", NINES).expect("should succeed");
        assert_eq!(latest, None);
    }

    #[rstest]
    #[case("1")]
    #[case("one.nine")]
    #[case("1.9.3")]
    fn latest_patch_rejects_malformed_release(#[case] release: &str) {
        let err = latest_patch(release, NINES).unwrap_err();
        assert!(matches!(err, VersionError::InvalidVersion { .. }));
    }

    // =========================================================================
    // rationalize_release_and_version
    // =========================================================================

    #[test]
    fn empty_request_returns_default_version() {
        let resolved =
            rationalize_release_and_version(OrchestratorType::Kubernetes, "", "", false, false)
                .expect("should succeed");
        let default =
            default_version(OrchestratorType::Kubernetes, false).expect("should succeed");
        assert_eq!(resolved, default);
    }

    #[test]
    fn rationalization_is_deterministic() {
        let first =
            rationalize_release_and_version(OrchestratorType::Kubernetes, "1.9", "", false, false);
        let second =
            rationalize_release_and_version(OrchestratorType::Kubernetes, "1.9", "", false, false);
        assert_eq!(first, second);
    }

    #[rstest]
    #[case::release_only("1.9", "", "1.9.10")]
    #[case::version_only("", "1.7.14", "1.7.14")]
    #[case::both_agree("1.10", "1.10.3", "1.10.3")]
    #[case::v_prefix("v1.9", "", "1.9.10")]
    fn rationalizes_supported_requests(
        #[case] release: &str,
        #[case] version: &str,
        #[case] expected: &str,
    ) {
        let resolved = rationalize_release_and_version(
            OrchestratorType::Kubernetes,
            release,
            version,
            false,
            false,
        )
        .expect("should succeed");
        assert_eq!(resolved, expected);
    }

    #[rstest]
    #[case::unknown_release("1.4", "")]
    #[case::unknown_version("", "1.9.99")]
    #[case::disagreeing_release("1.8", "1.9.6")]
    #[case::upgrade_only_version("", "1.8.0")]
    fn rejects_unsupported_requests(#[case] release: &str, #[case] version: &str) {
        let err = rationalize_release_and_version(
            OrchestratorType::Kubernetes,
            release,
            version,
            false,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, VersionError::UnsupportedVersion { .. }));
    }

    #[test]
    fn updates_admit_upgrade_only_versions() {
        let resolved =
            rationalize_release_and_version(OrchestratorType::Kubernetes, "", "1.8.0", true, false)
                .expect("should succeed");
        assert_eq!(resolved, "1.8.0");
    }

    #[test]
    fn windows_rejects_versions_without_windows_support() {
        let err =
            rationalize_release_and_version(OrchestratorType::Kubernetes, "1.6", "", false, true)
                .unwrap_err();
        assert!(matches!(err, VersionError::UnsupportedVersion { .. }));
    }

    #[test]
    fn fixed_version_orchestrators_accept_only_their_version() {
        let ok = rationalize_release_and_version(OrchestratorType::Swarm, "", "", false, false)
            .expect("should succeed");
        assert_eq!(ok, "swarm:1.1.0");
        assert!(
            rationalize_release_and_version(OrchestratorType::Swarm, "1.2", "", false, false)
                .is_err()
        );
    }

    #[test]
    fn unknown_orchestrator_name() {
        let err = parse_orchestrator("Nomad").unwrap_err();
        assert_eq!(
            err,
            VersionError::UnsupportedOrchestrator {
                orchestrator: "Nomad".to_string()
            }
        );
    }

    // =========================================================================
    // versions_in_range / is_version_at_least
    // =========================================================================

    #[test]
    fn range_excludes_prereleases_by_default() {
        let versions = ["1.10.0", "1.10.0-rc.1", "1.9.6", "1.11.0"];
        let range =
            versions_in_range(&versions, "1.9.0", "1.10.0", true, false).expect("should succeed");
        assert_eq!(range, vec!["1.9.6", "1.10.0"]);
    }

    #[test]
    fn range_orders_prereleases_by_precedence() {
        let versions = ["1.10.0-rc.1", "1.10.0-beta.2", "1.10.0-beta.10", "1.10.0"];
        let range =
            versions_in_range(&versions, "1.9.0", "1.10.0", true, true).expect("should succeed");
        assert_eq!(
            range,
            vec!["1.10.0-beta.2", "1.10.0-beta.10", "1.10.0-rc.1", "1.10.0"]
        );
    }

    #[test]
    fn exclusive_range_drops_bounds() {
        let range = versions_in_range(NINES, "1.9.0", "1.10.0", false, false)
            .expect("should succeed");
        assert_eq!(range, vec!["1.9.3", "1.9.6"]);
    }

    #[rstest]
    #[case("1.9.6", "1.9.0", true)]
    #[case("1.8.15", "1.9.0", false)]
    #[case("1.10.0-rc.1", "1.10.0", true)]
    #[case("1.10.0", "1.10.0-rc.1", true)]
    #[case("1.9", "1.9.0", true)]
    #[case("garbage", "1.9.0", false)]
    fn at_least_strips_actual_prerelease_only(
        #[case] actual: &str,
        #[case] floor: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_version_at_least(actual, floor), expected);
    }

    #[test]
    fn release_of_version() {
        assert_eq!(release_of("v1.10.0-rc.1").expect("should succeed"), "1.10");
    }
}
