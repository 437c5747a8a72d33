//! Cluster definition model

mod addon;
mod cluster;
mod types;

pub use addon::{AddonSpec, ContainerSpec};
pub use cluster::{
    AadProfile, AgentPoolProfile, CertificateProfile, ClusterDefinition, KubernetesConfig,
    MasterProfile, OrchestratorProfile, RoleKubernetesConfig, AVAILABILITY_SET, MANAGED_DISKS,
    VIRTUAL_MACHINE_SCALE_SETS,
};
pub use types::{
    regional_fqdn, regional_fqdns, CloudEnvironment, OrchestratorType, OsType, Tristate,
    AZURE_LOCATIONS,
};
