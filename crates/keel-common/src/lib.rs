//! Common types for keel
//!
//! This crate holds the cluster-definition model shared by the version,
//! configuration, PKI and graph crates, together with the shared error type,
//! engine configuration loading, and logging setup.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod flags;
pub mod model;
pub mod telemetry;

pub use config::{EngineConfig, ImageCatalog};
pub use error::Error;
pub use flags::FlagMap;
pub use model::{
    AadProfile, AddonSpec, AgentPoolProfile, CertificateProfile, CloudEnvironment,
    ClusterDefinition, ContainerSpec, KubernetesConfig, MasterProfile, OrchestratorProfile,
    OrchestratorType, OsType, RoleKubernetesConfig, Tristate, AZURE_LOCATIONS,
};
pub use model::{regional_fqdn, regional_fqdns};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Cluster-internal DNS domain used for service names and kubelet defaults
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Environment variable naming an engine configuration file
pub const CONFIG_ENV_VAR: &str = "KEEL_CONFIG";
