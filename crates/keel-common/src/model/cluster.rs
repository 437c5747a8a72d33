//! Cluster definition documents
//!
//! These mirror the JSON cluster-definition schema: camelCase field names,
//! optional sections omitted when absent.

use serde::{Deserialize, Serialize};

use super::{AddonSpec, CloudEnvironment, OrchestratorType, OsType};
use crate::FlagMap;

/// Availability profile value for scale-set based pools
pub const VIRTUAL_MACHINE_SCALE_SETS: &str = "VirtualMachineScaleSets";

/// Availability profile value for availability-set based pools
pub const AVAILABILITY_SET: &str = "AvailabilitySet";

/// Storage profile value for managed disks
pub const MANAGED_DISKS: &str = "ManagedDisks";

/// Complete cluster definition as supplied by the caller
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Region the cluster is deployed to
    #[serde(default)]
    pub location: String,
    /// Orchestrator selection and configuration
    pub orchestrator_profile: OrchestratorProfile,
    /// Master node settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_profile: Option<MasterProfile>,
    /// Agent pool settings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,
    /// Azure Active Directory integration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aad_profile: Option<AadProfile>,
    /// Caller-supplied certificate authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_profile: Option<CertificateProfile>,
}

impl ClusterDefinition {
    /// Parse a cluster definition from JSON
    pub fn from_json(data: &str) -> crate::Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| crate::Error::serialization_for("ClusterDefinition", e.to_string()))
    }

    /// True when any agent pool runs Windows
    pub fn has_windows(&self) -> bool {
        self.agent_pool_profiles
            .iter()
            .any(|p| p.os_type == OsType::Windows)
    }

    /// True when any agent pool uses an N-series (GPU) VM size
    pub fn has_gpu_pool(&self) -> bool {
        self.agent_pool_profiles.iter().any(|p| p.is_n_series())
    }

    /// Cloud the cluster's location belongs to
    pub fn cloud(&self) -> CloudEnvironment {
        CloudEnvironment::from_location(&self.location)
    }

    /// Number of masters, zero without a master profile
    pub fn master_count(&self) -> u32 {
        self.master_profile.as_ref().map(|m| m.count).unwrap_or(0)
    }
}

/// Orchestrator type, version, and configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorProfile {
    /// Orchestrator type
    pub orchestrator_type: OrchestratorType,
    /// Requested `major.minor` release
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub orchestrator_release: String,
    /// Requested exact version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub orchestrator_version: String,
    /// Kubernetes-specific configuration
    #[serde(default)]
    pub kubernetes_config: KubernetesConfig,
}

/// Kubernetes configuration and feature switches
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConfig {
    /// Registry prefix prepended to component images
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubernetes_image_base: String,
    /// Pod CIDR
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_subnet: String,
    /// Service CIDR
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_cidr: String,
    /// Cluster DNS service IP
    #[serde(rename = "dnsServiceIP", default, skip_serializing_if = "String::is_empty")]
    pub dns_service_ip: String,
    /// Network plugin ("kubenet", "azure", "flannel", ...)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_plugin: String,
    /// Network policy ("calico", "azure", "cilium", ...)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_policy: String,
    /// etcd version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_version: String,
    /// Role-based access control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_rbac: Option<bool>,
    /// Authenticated kubelet API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_secure_kubelet: Option<bool>,
    /// Aggregated API servers
    #[serde(rename = "enableAggregatedAPIs", default)]
    pub enable_aggregated_apis: bool,
    /// Run cloud-specific controllers in a separate cloud-controller-manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cloud_controller_manager: Option<bool>,
    /// Pod security policy admission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pod_security_policy: Option<bool>,
    /// Encrypt secrets at rest with a local key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_data_encryption_at_rest: Option<bool>,
    /// Encrypt secrets at rest with an external KMS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_encryption_with_external_kms: Option<bool>,
    /// Image GC high threshold percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_high_threshold: Option<u32>,
    /// Image GC low threshold percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_low_threshold: Option<u32>,
    /// User kubelet flags (cluster-wide)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_config: Option<FlagMap>,
    /// User controller-manager flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_manager_config: Option<FlagMap>,
    /// User cloud-controller-manager flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager_config: Option<FlagMap>,
    /// User API server flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server_config: Option<FlagMap>,
    /// User scheduler flags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_config: Option<FlagMap>,
    /// User addon declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<AddonSpec>>,
}

impl KubernetesConfig {
    /// RBAC is on
    pub fn rbac_enabled(&self) -> bool {
        self.enable_rbac.unwrap_or(false)
    }

    /// Kubelet authentication is on
    pub fn secure_kubelet_enabled(&self) -> bool {
        self.enable_secure_kubelet.unwrap_or(false)
    }

    /// A separate cloud-controller-manager is deployed
    pub fn uses_cloud_controller_manager(&self) -> bool {
        self.use_cloud_controller_manager.unwrap_or(false)
    }

    /// Pod security policy admission is on
    pub fn pod_security_policy_enabled(&self) -> bool {
        self.enable_pod_security_policy.unwrap_or(false)
    }

    /// Secrets are encrypted at rest, either locally or with a KMS
    pub fn encryption_at_rest_enabled(&self) -> bool {
        self.enable_data_encryption_at_rest.unwrap_or(false)
            || self.enable_encryption_with_external_kms.unwrap_or(false)
    }

    /// Azure CNI is the network plugin
    pub fn is_azure_cni(&self) -> bool {
        self.network_plugin == "azure"
    }
}

/// Master node settings
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    /// Number of masters
    pub count: u32,
    /// DNS label of the master public IP
    #[serde(default)]
    pub dns_prefix: String,
    /// Master VM size
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vm_size: String,
    /// First static IP of the master nodes
    #[serde(rename = "firstConsecutiveStaticIP", default, skip_serializing_if = "String::is_empty")]
    pub first_consecutive_static_ip: String,
    /// Extra DNS names for the API server certificate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alt_names: Vec<String>,
    /// Disk storage ("ManagedDisks" or "StorageAccount")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_profile: String,
    /// Master-specific overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<RoleKubernetesConfig>,
}

impl MasterProfile {
    /// Masters use managed disks
    pub fn is_managed_disks(&self) -> bool {
        self.storage_profile == MANAGED_DISKS
    }
}

/// Agent pool settings
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    /// Pool name
    pub name: String,
    /// Number of nodes
    #[serde(default)]
    pub count: u32,
    /// Node VM size
    #[serde(default)]
    pub vm_size: String,
    /// Node operating system
    #[serde(default)]
    pub os_type: OsType,
    /// "VirtualMachineScaleSets" or "AvailabilitySet"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub availability_profile: String,
    /// Pool-specific overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_config: Option<RoleKubernetesConfig>,
}

impl AgentPoolProfile {
    /// Pool uses an N-series GPU VM size
    pub fn is_n_series(&self) -> bool {
        self.vm_size.to_lowercase().starts_with("standard_n")
    }

    /// Pool is backed by a scale set
    pub fn is_scale_set(&self) -> bool {
        self.availability_profile == VIRTUAL_MACHINE_SCALE_SETS
    }
}

/// Per-role configuration overrides
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleKubernetesConfig {
    /// Kubelet flags for this role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_config: Option<FlagMap>,
}

/// Azure Active Directory integration settings
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AadProfile {
    /// Server application ID
    #[serde(rename = "serverAppID")]
    pub server_app_id: String,
    /// Tenant ID
    #[serde(rename = "tenantID", default)]
    pub tenant_id: String,
}

/// Caller-supplied certificate authority and, optionally, leaf pairs
///
/// Leaf pairs are grouped: a group is reused only when every member of it is
/// present, and only alongside the CA that signed it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateProfile {
    /// PEM-encoded CA certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_certificate: String,
    /// PEM-encoded CA private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ca_private_key: String,
    /// API server certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_server_certificate: String,
    /// API server private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_server_private_key: String,
    /// Admin client certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_certificate: String,
    /// Admin client private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_private_key: String,
    /// Kubeconfig certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kube_config_certificate: String,
    /// Kubeconfig private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kube_config_private_key: String,
    /// etcd server certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_server_certificate: String,
    /// etcd server private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_server_private_key: String,
    /// etcd client certificate
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_client_certificate: String,
    /// etcd client private key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_client_private_key: String,
    /// etcd peer certificates, one per master in master order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub etcd_peer_certificates: Vec<String>,
    /// etcd peer private keys, paired with the certificates by index
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub etcd_peer_private_keys: Vec<String>,
}

impl CertificateProfile {
    /// Both halves of the CA pair are present
    pub fn has_ca(&self) -> bool {
        !self.ca_certificate.is_empty() && !self.ca_private_key.is_empty()
    }

    /// API server pair is present
    pub fn has_api_server(&self) -> bool {
        !self.api_server_certificate.is_empty() && !self.api_server_private_key.is_empty()
    }

    /// Client pair is present
    pub fn has_client(&self) -> bool {
        !self.client_certificate.is_empty() && !self.client_private_key.is_empty()
    }

    /// Kubeconfig pair is present
    pub fn has_kube_config(&self) -> bool {
        !self.kube_config_certificate.is_empty() && !self.kube_config_private_key.is_empty()
    }

    /// Server, client and exactly one peer pair per master are all present
    pub fn has_etcd(&self, master_count: u32) -> bool {
        let peers = master_count as usize;
        !self.etcd_server_certificate.is_empty()
            && !self.etcd_server_private_key.is_empty()
            && !self.etcd_client_certificate.is_empty()
            && !self.etcd_client_private_key.is_empty()
            && self.etcd_peer_certificates.len() == peers
            && self.etcd_peer_private_keys.len() == peers
            && self
                .etcd_peer_certificates
                .iter()
                .chain(&self.etcd_peer_private_keys)
                .all(|pem| !pem.is_empty())
    }
}
