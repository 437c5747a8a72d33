//! Orchestrator version rationalization
//!
//! Resolves a requested `(release, version)` pair against the table of
//! supported orchestrator versions, and answers the version questions the
//! resolvers gate features on: latest patch of a release, versions in a range,
//! "at least" floors, and upgrade targets.
//!
//! All comparisons are semantic-version comparisons. Pre-release versions
//! (`-alpha`, `-beta`, `-rc`) order below their release.

#![deny(missing_docs)]

mod error;
mod rationalize;
mod tables;
mod upgrade;

pub use error::{Result, VersionError};
pub use rationalize::{
    is_version_at_least, latest_patch, parse_orchestrator, parse_version,
    rationalize_release_and_version, release_of, versions_in_range,
};
pub use tables::{default_version, supported_versions, KUBERNETES_DEFAULT_RELEASE};
pub use upgrade::{
    orchestrator_version_profiles, upgrade_releases, upgrade_targets, OrchestratorVersionProfile,
};
