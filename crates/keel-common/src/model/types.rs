//! Enumerations used throughout the cluster-definition model

use serde::{Deserialize, Serialize};

/// Container orchestrator being deployed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrchestratorType {
    /// Kubernetes
    #[default]
    Kubernetes,
    /// DC/OS
    Dcos,
    /// Classic Docker Swarm
    Swarm,
    /// Docker CE swarm mode
    DockerCe,
    /// OpenShift
    OpenShift,
}

impl OrchestratorType {
    /// All orchestrator types, in display order
    pub const ALL: [OrchestratorType; 5] = [
        Self::Kubernetes,
        Self::Dcos,
        Self::Swarm,
        Self::DockerCe,
        Self::OpenShift,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kubernetes => "Kubernetes",
            Self::Dcos => "DCOS",
            Self::Swarm => "Swarm",
            Self::DockerCe => "DockerCE",
            Self::OpenShift => "OpenShift",
        }
    }
}

impl std::str::FromStr for OrchestratorType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kubernetes" => Ok(Self::Kubernetes),
            "dcos" => Ok(Self::Dcos),
            "swarm" => Ok(Self::Swarm),
            "dockerce" | "swarmmode" => Ok(Self::DockerCe),
            "openshift" => Ok(Self::OpenShift),
            _ => Err(crate::Error::validation_for_field(
                "orchestratorProfile.orchestratorType",
                format!(
                    "unsupported orchestrator '{s}', expected one of: Kubernetes, DCOS, Swarm, DockerCE, OpenShift"
                ),
            )),
        }
    }
}

impl TryFrom<String> for OrchestratorType {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrchestratorType> for String {
    fn from(value: OrchestratorType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for OrchestratorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system of a node pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OsType {
    /// Linux nodes
    #[default]
    Linux,
    /// Windows nodes
    Windows,
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::Windows => write!(f, "Windows"),
        }
    }
}

/// Three-valued enablement flag
///
/// Serialized as an optional boolean: `null`/absent is [`Tristate::Unset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Tristate {
    /// No explicit choice was made
    #[default]
    Unset,
    /// Explicitly enabled
    Enabled,
    /// Explicitly disabled
    Disabled,
}

impl Tristate {
    /// True when no explicit choice was made
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Collapse to a boolean, using `default` when unset
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Self::Unset => default,
            Self::Enabled => true,
            Self::Disabled => false,
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::Enabled,
            Some(false) => Self::Disabled,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

impl From<Tristate> for Option<bool> {
    fn from(value: Tristate) -> Self {
        match value {
            Tristate::Unset => None,
            Tristate::Enabled => Some(true),
            Tristate::Disabled => Some(false),
        }
    }
}

/// Every Azure region a cluster's public name may be resolved in
///
/// The API server certificate carries one FQDN per region so a DNS prefix
/// stays valid wherever the cluster is reached from.
pub const AZURE_LOCATIONS: &[&str] = &[
    "australiacentral",
    "australiacentral2",
    "australiaeast",
    "australiasoutheast",
    "brazilsouth",
    "canadacentral",
    "canadaeast",
    "centralindia",
    "centralus",
    "eastasia",
    "eastus",
    "eastus2",
    "francecentral",
    "francesouth",
    "japaneast",
    "japanwest",
    "koreacentral",
    "koreasouth",
    "northcentralus",
    "northeurope",
    "southcentralus",
    "southeastasia",
    "southindia",
    "uksouth",
    "ukwest",
    "westcentralus",
    "westeurope",
    "westindia",
    "westus",
    "westus2",
    "chinaeast",
    "chinaeast2",
    "chinanorth",
    "chinanorth2",
    "germanycentral",
    "germanynortheast",
    "usgovvirginia",
    "usgoviowa",
    "usgovarizona",
    "usgovtexas",
];

/// Public FQDN of `prefix` in `location`, using the suffix of the location's cloud
pub fn regional_fqdn(prefix: &str, location: &str) -> String {
    let location = normalize_location(location);
    let cloud = CloudEnvironment::from_location(&location);
    format!("{}.{}.{}", prefix, location, cloud.cloudapp_suffix())
}

/// Public FQDNs of `prefix` in every known region plus `location`
pub fn regional_fqdns(prefix: &str, location: &str) -> Vec<String> {
    let location = normalize_location(location);
    let mut fqdns: Vec<String> = AZURE_LOCATIONS
        .iter()
        .map(|l| regional_fqdn(prefix, l))
        .collect();
    if !location.is_empty() && !AZURE_LOCATIONS.contains(&location.as_str()) {
        fqdns.push(regional_fqdn(prefix, &location));
    }
    fqdns
}

fn normalize_location(location: &str) -> String {
    location.to_lowercase().replace(' ', "")
}

/// Sovereign cloud a location belongs to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum CloudEnvironment {
    /// Global public cloud
    #[default]
    Public,
    /// China cloud
    China,
    /// Germany cloud
    Germany,
    /// US Government cloud
    UsGovernment,
}

impl CloudEnvironment {
    /// Determine the cloud for a region name such as "chinaeast2"
    pub fn from_location(location: &str) -> Self {
        let location = normalize_location(location);
        match location.as_str() {
            "chinaeast" | "chinanorth" | "chinaeast2" | "chinanorth2" => Self::China,
            "germanynortheast" | "germanycentral" => Self::Germany,
            l if l.starts_with("usgov") || l.starts_with("usdod") => Self::UsGovernment,
            _ => Self::Public,
        }
    }

    /// DNS suffix for public IP FQDNs in this cloud
    pub fn cloudapp_suffix(&self) -> &'static str {
        match self {
            Self::Public => "cloudapp.azure.com",
            Self::China => "cloudapp.chinacloudapi.cn",
            Self::Germany => "cloudapp.microsoftazure.de",
            Self::UsGovernment => "cloudapp.usgovcloudapi.net",
        }
    }

    /// Host of the token issuer used for OIDC authentication
    pub fn sts_host(&self) -> &'static str {
        match self {
            Self::China => "sts.chinacloudapi.cn",
            _ => "sts.windows.net",
        }
    }
}
