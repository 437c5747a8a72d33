//! Cluster definition defaults
//!
//! Fills the network and feature settings a cluster definition left empty.
//! The input is never modified; resolvers work on the returned copy.

use keel_common::{ClusterDefinition, EngineConfig};

/// Pod CIDR for kubenet and overlay plugins
pub const DEFAULT_CLUSTER_SUBNET: &str = "10.244.0.0/16";
/// Pod CIDR when pods draw addresses from the VNET
pub const DEFAULT_AZURE_CNI_SUBNET: &str = "10.240.0.0/12";
/// Service CIDR
pub const DEFAULT_SERVICE_CIDR: &str = "10.0.0.0/16";
/// Cluster DNS service IP inside the service CIDR
pub const DEFAULT_DNS_SERVICE_IP: &str = "10.0.0.10";
/// Network plugin
pub const DEFAULT_NETWORK_PLUGIN: &str = "kubenet";
/// etcd version
pub const DEFAULT_ETCD_VERSION: &str = "3.2.23";
/// First static IP of the masters
pub const DEFAULT_FIRST_MASTER_IP: &str = "10.240.255.5";

fn fill(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

/// Copy of `definition` with defaults applied and the version pinned
pub fn apply_cluster_defaults(
    definition: &ClusterDefinition,
    version: &str,
    engine: &EngineConfig,
) -> ClusterDefinition {
    let mut def = definition.clone();
    def.orchestrator_profile.orchestrator_version = version.to_string();

    let k8s = &mut def.orchestrator_profile.kubernetes_config;
    fill(&mut k8s.kubernetes_image_base, &engine.kubernetes_image_base);
    fill(&mut k8s.network_plugin, DEFAULT_NETWORK_PLUGIN);
    let subnet = if k8s.is_azure_cni() {
        DEFAULT_AZURE_CNI_SUBNET
    } else {
        DEFAULT_CLUSTER_SUBNET
    };
    fill(&mut k8s.cluster_subnet, subnet);
    fill(&mut k8s.service_cidr, DEFAULT_SERVICE_CIDR);
    fill(&mut k8s.dns_service_ip, DEFAULT_DNS_SERVICE_IP);
    fill(&mut k8s.etcd_version, DEFAULT_ETCD_VERSION);
    k8s.enable_rbac.get_or_insert(true);
    k8s.enable_secure_kubelet.get_or_insert(true);
    k8s.gc_high_threshold.get_or_insert(85);
    k8s.gc_low_threshold.get_or_insert(80);

    if let Some(master) = def.master_profile.as_mut() {
        fill(&mut master.first_consecutive_static_ip, DEFAULT_FIRST_MASTER_IP);
    }

    def
}
