//! Built-in addon defaults

use keel_common::{AddonSpec, ContainerSpec, Tristate};

use crate::ResolveContext;

/// When a catalog addon is on by default
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enablement {
    /// Always on or always off
    Fixed(bool),
    /// On at or above a version
    AtLeast(&'static str),
    /// On at or above a version when a pool uses an N-series SKU
    GpuPoolAtLeast(&'static str),
    /// On with the Azure CNI network plugin
    AzureCni,
    /// On with Azure CNI and the Azure network policy
    AzureNetworkPolicy,
}

impl Enablement {
    /// Evaluate against a cluster
    pub fn evaluate(&self, ctx: &ResolveContext<'_>) -> bool {
        let k8s = ctx.kubernetes();
        match self {
            Self::Fixed(enabled) => *enabled,
            Self::AtLeast(floor) => ctx.at_least(floor),
            Self::GpuPoolAtLeast(floor) => ctx.definition.has_gpu_pool() && ctx.at_least(floor),
            Self::AzureCni => k8s.is_azure_cni(),
            Self::AzureNetworkPolicy => k8s.is_azure_cni() && k8s.network_policy == "azure",
        }
    }
}

/// Where a default container image comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// Fixed image reference
    Fixed(&'static str),
    /// Image catalog component, prefixed with the image base
    Catalog(&'static str),
}

/// Default settings of one addon container
#[derive(Clone, Copy, Debug)]
pub struct ContainerDefault {
    /// Container name
    pub name: &'static str,
    /// Image source
    pub image: ImageSource,
    /// CPU request
    pub cpu_requests: &'static str,
    /// Memory request
    pub memory_requests: &'static str,
    /// CPU limit
    pub cpu_limits: &'static str,
    /// Memory limit
    pub memory_limits: &'static str,
}

impl ContainerDefault {
    const fn new(name: &'static str, image: ImageSource, cpu: &'static str, memory: &'static str) -> Self {
        Self {
            name,
            image,
            cpu_requests: cpu,
            memory_requests: memory,
            cpu_limits: cpu,
            memory_limits: memory,
        }
    }

    fn to_spec(self, ctx: &ResolveContext<'_>) -> ContainerSpec {
        let image = match self.image {
            ImageSource::Fixed(image) => image.to_string(),
            ImageSource::Catalog(component) => ctx.component_image(component),
        };
        ContainerSpec {
            name: self.name.to_string(),
            image,
            cpu_requests: self.cpu_requests.to_string(),
            memory_requests: self.memory_requests.to_string(),
            cpu_limits: self.cpu_limits.to_string(),
            memory_limits: self.memory_limits.to_string(),
        }
    }
}

/// One catalog addon
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry {
    /// Addon name
    pub name: &'static str,
    /// Default enablement
    pub enablement: Enablement,
    /// Default containers
    pub containers: &'static [ContainerDefault],
    /// Default config entries
    pub config: &'static [(&'static str, &'static str)],
}

impl CatalogEntry {
    /// Default addon spec for a cluster, with enablement decided
    pub fn to_spec(&self, ctx: &ResolveContext<'_>) -> AddonSpec {
        AddonSpec {
            name: self.name.to_string(),
            enabled: Tristate::from(self.enablement.evaluate(ctx)),
            containers: self.containers.iter().map(|c| c.to_spec(ctx)).collect(),
            config: self
                .config
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Tiller (Helm server)
pub const TILLER: &str = "tiller";
/// ACI connector (virtual kubelet)
pub const ACI_CONNECTOR: &str = "aci-connector";
/// Cluster autoscaler
pub const CLUSTER_AUTOSCALER: &str = "cluster-autoscaler";
/// Blobfuse flexvolume driver
pub const BLOBFUSE_FLEXVOLUME: &str = "blobfuse-flexvolume";
/// SMB flexvolume driver
pub const SMB_FLEXVOLUME: &str = "smb-flexvolume";
/// Key Vault flexvolume driver
pub const KEYVAULT_FLEXVOLUME: &str = "keyvault-flexvolume";
/// Kubernetes dashboard
pub const DASHBOARD: &str = "kubernetes-dashboard";
/// Rescheduler
pub const RESCHEDULER: &str = "rescheduler";
/// Metrics server
pub const METRICS_SERVER: &str = "metrics-server";
/// NVIDIA device plugin
pub const NVIDIA_DEVICE_PLUGIN: &str = "nvidia-device-plugin";
/// Container monitoring agent
pub const CONTAINER_MONITORING: &str = "container-monitoring";
/// Azure CNI network monitor
pub const AZURE_CNI_NETWORK_MONITOR: &str = "azure-cni-networkmonitor";
/// Azure network policy manager
pub const AZURE_NPM_DAEMONSET: &str = "azure-npm-daemonset";
/// IP masquerade agent
pub const IP_MASQ_AGENT: &str = "ip-masq-agent";

const BUILTIN: &[CatalogEntry] = &[
    CatalogEntry {
        name: TILLER,
        enablement: Enablement::Fixed(true),
        containers: &[ContainerDefault::new(TILLER, ImageSource::Catalog(TILLER), "50m", "150Mi")],
        config: &[("max-history", "5")],
    },
    CatalogEntry {
        name: ACI_CONNECTOR,
        enablement: Enablement::Fixed(false),
        containers: &[ContainerDefault::new(
            ACI_CONNECTOR,
            ImageSource::Fixed("microsoft/virtual-kubelet:latest"),
            "50m",
            "150Mi",
        )],
        config: &[
            ("region", "westus"),
            ("nodeName", "aci-connector"),
            ("os", "Linux"),
            ("taint", "azure.com/aci"),
        ],
    },
    CatalogEntry {
        name: CLUSTER_AUTOSCALER,
        enablement: Enablement::Fixed(false),
        containers: &[ContainerDefault::new(
            CLUSTER_AUTOSCALER,
            ImageSource::Catalog(CLUSTER_AUTOSCALER),
            "100m",
            "300Mi",
        )],
        config: &[("minNodes", "1"), ("maxNodes", "5")],
    },
    CatalogEntry {
        name: BLOBFUSE_FLEXVOLUME,
        enablement: Enablement::AtLeast("1.8.0"),
        containers: &[ContainerDefault::new(
            BLOBFUSE_FLEXVOLUME,
            ImageSource::Fixed("mcr.microsoft.com/k8s/flexvolume/blobfuse-flexvolume"),
            "50m",
            "10Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: SMB_FLEXVOLUME,
        enablement: Enablement::AtLeast("1.8.0"),
        containers: &[ContainerDefault::new(
            SMB_FLEXVOLUME,
            ImageSource::Fixed("mcr.microsoft.com/k8s/flexvolume/smb-flexvolume"),
            "50m",
            "10Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: KEYVAULT_FLEXVOLUME,
        enablement: Enablement::Fixed(true),
        containers: &[ContainerDefault::new(
            KEYVAULT_FLEXVOLUME,
            ImageSource::Fixed("mcr.microsoft.com/k8s/flexvolume/keyvault-flexvolume:v0.0.5"),
            "50m",
            "10Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: DASHBOARD,
        enablement: Enablement::Fixed(true),
        containers: &[ContainerDefault::new(
            DASHBOARD,
            ImageSource::Catalog("dashboard"),
            "300m",
            "150Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: RESCHEDULER,
        enablement: Enablement::Fixed(false),
        containers: &[ContainerDefault::new(
            RESCHEDULER,
            ImageSource::Catalog(RESCHEDULER),
            "10m",
            "100Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: METRICS_SERVER,
        enablement: Enablement::AtLeast("1.9.0"),
        containers: &[ContainerDefault::new(
            METRICS_SERVER,
            ImageSource::Catalog(METRICS_SERVER),
            "",
            "",
        )],
        config: &[],
    },
    CatalogEntry {
        name: NVIDIA_DEVICE_PLUGIN,
        enablement: Enablement::GpuPoolAtLeast("1.10.0"),
        containers: &[ContainerDefault::new(
            NVIDIA_DEVICE_PLUGIN,
            ImageSource::Fixed("nvidia/k8s-device-plugin:1.10"),
            "50m",
            "10Mi",
        )],
        config: &[],
    },
    CatalogEntry {
        name: CONTAINER_MONITORING,
        enablement: Enablement::Fixed(false),
        containers: &[ContainerDefault {
            name: "omsagent",
            image: ImageSource::Fixed("microsoft/oms:ciprod10162018-2"),
            cpu_requests: "50m",
            memory_requests: "200Mi",
            cpu_limits: "150m",
            memory_limits: "750Mi",
        }],
        config: &[
            ("omsAgentVersion", "1.6.0-42"),
            ("dockerProviderVersion", "2.0.0-3"),
        ],
    },
    CatalogEntry {
        name: AZURE_CNI_NETWORK_MONITOR,
        enablement: Enablement::AzureCni,
        containers: &[ContainerDefault::new(
            AZURE_CNI_NETWORK_MONITOR,
            ImageSource::Fixed("containernetworking/networkmonitor:v0.0.4"),
            "",
            "",
        )],
        config: &[],
    },
    CatalogEntry {
        name: AZURE_NPM_DAEMONSET,
        enablement: Enablement::AzureNetworkPolicy,
        containers: &[ContainerDefault::new(
            AZURE_NPM_DAEMONSET,
            ImageSource::Fixed("containernetworking/azure-npm:v0.0.4"),
            "",
            "",
        )],
        config: &[],
    },
    CatalogEntry {
        name: IP_MASQ_AGENT,
        enablement: Enablement::Fixed(true),
        containers: &[ContainerDefault {
            name: IP_MASQ_AGENT,
            image: ImageSource::Catalog(IP_MASQ_AGENT),
            cpu_requests: "50m",
            memory_requests: "50Mi",
            cpu_limits: "50m",
            memory_limits: "250Mi",
        }],
        config: &[],
    },
];

/// Immutable table of built-in addon defaults
#[derive(Clone, Copy, Debug)]
pub struct AddonCatalog {
    entries: &'static [CatalogEntry],
}

impl AddonCatalog {
    /// Catalog shipped with keel
    pub fn builtin() -> Self {
        Self { entries: BUILTIN }
    }

    /// Catalog entries
    pub fn entries(&self) -> &'static [CatalogEntry] {
        self.entries
    }

    /// Default addon specs for a cluster
    pub fn defaults_for(&self, ctx: &ResolveContext<'_>) -> Vec<AddonSpec> {
        self.entries.iter().map(|entry| entry.to_spec(ctx)).collect()
    }
}

impl Default for AddonCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
