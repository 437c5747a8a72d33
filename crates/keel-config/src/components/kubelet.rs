//! kubelet flags
//!
//! The cluster-wide kubelet map is resolved first. Master and agent pool maps
//! then inherit from it, layering their own overrides and the static set of
//! their operating system on top.

use keel_common::config::{NODE_STATUS_FREQUENCY, PAUSE_IMAGE};
use keel_common::flags::{add_feature_gates, flag_map};
use keel_common::{AgentPoolProfile, FlagMap, OsType};
use tracing::debug;

use super::{resolve_with_rules, ComponentRules, CA_CERT_PATH, CLOUD_CONFIG_PATH, KUBECONFIG_PATH};
use crate::layers::{LayerKind, LayeredFlags};
use crate::ResolveContext;

const POD_MANIFEST_PATH: &str = "--pod-manifest-path";

/// Kubelet flags that older versions reject, with the first version accepting them
const MINIMUM_VERSIONS: &[(&str, &str)] = &[
    ("--non-masquerade-cidr", "1.6.0"),
    ("--cgroups-per-qos", "1.6.0"),
    ("--enforce-node-allocatable", "1.6.0"),
    ("--pod-max-pids", "1.10.0"),
];

/// Kubelet flags removed in newer versions, with the first version rejecting them
const REMOVED_IN: &[(&str, &str)] = &[("--cadvisor-port", "1.12.0")];

/// kubelet rules
#[derive(Clone, Copy, Debug, Default)]
pub struct KubeletRules;

impl ComponentRules for KubeletRules {
    fn defaults(&self, ctx: &ResolveContext<'_>) -> FlagMap {
        let k8s = ctx.kubernetes();
        let max_pods = if k8s.is_azure_cni() { "30" } else { "110" };
        let pause_image = match ctx.catalog_value(PAUSE_IMAGE) {
            Some(image) => format!("{}{}", ctx.image_base(), image),
            None => String::new(),
        };
        let status_frequency = ctx.catalog_value(NODE_STATUS_FREQUENCY).unwrap_or("10s");

        flag_map([
            ("--cluster-domain", ctx.engine.cluster_domain.clone()),
            ("--network-plugin", "cni".to_string()),
            ("--pod-infra-container-image", pause_image),
            ("--max-pods", max_pods.to_string()),
            (
                "--eviction-hard",
                "memory.available<100Mi,nodefs.available<10%,nodefs.inodesFree<5%".to_string(),
            ),
            ("--node-status-update-frequency", status_frequency.to_string()),
            (
                "--image-gc-high-threshold",
                k8s.gc_high_threshold.unwrap_or(85).to_string(),
            ),
            (
                "--image-gc-low-threshold",
                k8s.gc_low_threshold.unwrap_or(80).to_string(),
            ),
            ("--non-masquerade-cidr", k8s.cluster_subnet.clone()),
            ("--cloud-provider", "azure".to_string()),
            ("--cloud-config", CLOUD_CONFIG_PATH.to_string()),
            (
                "--azure-container-registry-config",
                CLOUD_CONFIG_PATH.to_string(),
            ),
            ("--event-qps", "0".to_string()),
            ("--cadvisor-port", "0".to_string()),
            ("--pod-max-pids", "100".to_string()),
            ("--image-pull-progress-deadline", "30m".to_string()),
        ])
    }

    fn computed(&self, ctx: &ResolveContext<'_>) -> FlagMap {
        let k8s = ctx.kubernetes();
        let mut flags = FlagMap::new();
        if k8s.uses_cloud_controller_manager() {
            flags.insert("--cloud-provider".to_string(), "external".to_string());
        }
        if k8s.network_plugin == "kubenet" && k8s.network_policy != "calico" {
            flags.insert("--network-plugin".to_string(), "kubenet".to_string());
        }
        flags
    }

    fn static_flags(&self, ctx: &ResolveContext<'_>, os: OsType) -> FlagMap {
        let mut flags = flag_map([
            ("--address", "0.0.0.0".to_string()),
            ("--allow-privileged", "true".to_string()),
            ("--anonymous-auth", "false".to_string()),
            ("--authorization-mode", "Webhook".to_string()),
            ("--client-ca-file", CA_CERT_PATH.to_string()),
            (POD_MANIFEST_PATH, "/etc/kubernetes/manifests".to_string()),
            ("--cluster-dns", ctx.kubernetes().dns_service_ip.clone()),
            ("--cgroups-per-qos", "true".to_string()),
            ("--enforce-node-allocatable", "pods".to_string()),
            ("--kubeconfig", KUBECONFIG_PATH.to_string()),
            ("--keep-terminated-pod-volumes", "false".to_string()),
        ]);

        if os == OsType::Windows {
            flags.extend(windows_overrides());
        }
        flags
    }

    fn prune(&self, ctx: &ResolveContext<'_>, flags: &mut FlagMap) {
        for (flag, floor) in MINIMUM_VERSIONS {
            if !ctx.at_least(floor) {
                flags.remove(*flag);
            }
        }
        for (flag, removed) in REMOVED_IN {
            if ctx.at_least(removed) {
                flags.remove(*flag);
            }
        }
        if !ctx.kubernetes().secure_kubelet_enabled() {
            flags.remove("--anonymous-auth");
            flags.remove("--client-ca-file");
        }
    }
}

/// Values Windows nodes need on top of the Linux static set
fn windows_overrides() -> FlagMap {
    flag_map([
        ("--azure-container-registry-config", r"c:\k\azure.json"),
        ("--kubeconfig", r"c:\k\config"),
        ("--cloud-config", r"c:\k\azure.json"),
        ("--client-ca-file", r"c:\k\ca.crt"),
        ("--pod-infra-container-image", "kubletwin/pause"),
        ("--cgroups-per-qos", "false"),
        ("--enforce-node-allocatable", r#""""""#),
        ("--hairpin-mode", "promiscuous-bridge"),
        ("--image-pull-progress-deadline", "20m"),
        ("--resolv-conf", r#""""""#),
    ])
}

/// Node role a kubelet map is resolved for
#[derive(Clone, Copy, Debug)]
pub enum KubeletRole<'a> {
    /// Master nodes
    Master,
    /// One agent pool
    Agent(&'a AgentPoolProfile),
}

impl KubeletRole<'_> {
    fn os(&self) -> OsType {
        match self {
            Self::Master => OsType::Linux,
            Self::Agent(pool) => pool.os_type,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Master => "master",
            Self::Agent(pool) => &pool.name,
        }
    }
}

/// Resolve the kubelet flags of one node role
///
/// Keys missing from the role's own overrides are inherited from the resolved
/// cluster-wide map. The role's static set is re-applied so inherited or
/// user values can't displace it.
pub fn resolve_role_kubelet(
    cluster_kubelet: &FlagMap,
    role: KubeletRole<'_>,
    ctx: &ResolveContext<'_>,
) -> FlagMap {
    let role_flags = match role {
        KubeletRole::Master => ctx.definition.master_profile.as_ref().and_then(|m| m.kubernetes_config.as_ref()),
        KubeletRole::Agent(pool) => pool.kubernetes_config.as_ref(),
    }
    .and_then(|k| k.kubelet_config.as_ref());

    let rules = KubeletRules;
    let os = role.os();
    let mut flags = LayeredFlags::new()
        .with_layer(LayerKind::Default, cluster_kubelet.clone())
        .with_optional_layer(LayerKind::User, role_flags)
        .with_layer(LayerKind::Static, rules.static_flags(ctx, os))
        .resolve();
    rules.prune(ctx, &mut flags);

    if os == OsType::Windows {
        flags.remove(POD_MANIFEST_PATH);
    }

    if let KubeletRole::Agent(pool) = role {
        if pool.is_n_series() && !ctx.at_least("1.11.0") {
            add_feature_gates(&mut flags, "Accelerators=true");
        }
    }

    debug!(role = role.name(), flags = flags.len(), "resolved kubelet flags");
    flags
}

/// Resolve the cluster-wide kubelet map
pub(crate) fn resolve_cluster_kubelet(ctx: &ResolveContext<'_>) -> FlagMap {
    let user = ctx.kubernetes().kubelet_config.as_ref();
    resolve_with_rules(&KubeletRules, user, ctx, OsType::Linux)
}
