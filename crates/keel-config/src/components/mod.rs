//! Component flag resolution
//!
//! Every managed component is described by a [`ComponentRules`] implementation.
//! Resolution runs in a fixed order:
//!
//! 1. defaults fill keys the user left out
//! 2. computed and static layers replace whatever came before
//! 3. version floors prune keys the version doesn't accept
//! 4. cross-cutting rules (RBAC, feature gates) run last

mod apiserver;
mod cloud_controller_manager;
mod controller_manager;
mod kubelet;
mod scheduler;

use keel_common::{FlagMap, OsType};
use serde::Serialize;

use crate::layers::{LayerKind, LayeredFlags};
use crate::ResolveContext;

pub use apiserver::ApiServerRules;
pub use cloud_controller_manager::CloudControllerManagerRules;
pub use controller_manager::ControllerManagerRules;
pub(crate) use kubelet::resolve_cluster_kubelet;
pub use kubelet::{resolve_role_kubelet, KubeletRole, KubeletRules};
pub use scheduler::SchedulerRules;

/// Kubeconfig used by control plane components on Linux
pub(crate) const KUBECONFIG_PATH: &str = "/var/lib/kubelet/kubeconfig";
/// Cloud provider configuration on Linux
pub(crate) const CLOUD_CONFIG_PATH: &str = "/etc/kubernetes/azure.json";
/// Cluster CA certificate on Linux
pub(crate) const CA_CERT_PATH: &str = "/etc/kubernetes/certs/ca.crt";

/// A managed cluster component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// kube-apiserver
    ApiServer,
    /// kube-controller-manager
    ControllerManager,
    /// cloud-controller-manager
    CloudControllerManager,
    /// kube-scheduler
    Scheduler,
    /// kubelet
    Kubelet,
}

impl Component {
    /// All components
    pub const ALL: [Component; 5] = [
        Self::ApiServer,
        Self::ControllerManager,
        Self::CloudControllerManager,
        Self::Scheduler,
        Self::Kubelet,
    ];

    /// Rules describing this component
    pub fn rules(&self) -> &'static dyn ComponentRules {
        match self {
            Self::ApiServer => &ApiServerRules,
            Self::ControllerManager => &ControllerManagerRules,
            Self::CloudControllerManager => &CloudControllerManagerRules,
            Self::Scheduler => &SchedulerRules,
            Self::Kubelet => &KubeletRules,
        }
    }

    /// User flags for this component in the cluster definition
    pub fn user_flags<'a>(&self, ctx: &ResolveContext<'a>) -> Option<&'a FlagMap> {
        let k8s = ctx.kubernetes();
        match self {
            Self::ApiServer => k8s.api_server_config.as_ref(),
            Self::ControllerManager => k8s.controller_manager_config.as_ref(),
            Self::CloudControllerManager => k8s.cloud_controller_manager_config.as_ref(),
            Self::Scheduler => k8s.scheduler_config.as_ref(),
            Self::Kubelet => k8s.kubelet_config.as_ref(),
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiServer => write!(f, "kube-apiserver"),
            Self::ControllerManager => write!(f, "kube-controller-manager"),
            Self::CloudControllerManager => write!(f, "cloud-controller-manager"),
            Self::Scheduler => write!(f, "kube-scheduler"),
            Self::Kubelet => write!(f, "kubelet"),
        }
    }
}

/// Flag rules of one component
pub trait ComponentRules: Send + Sync {
    /// Version- and feature-gated defaults
    fn defaults(&self, ctx: &ResolveContext<'_>) -> FlagMap;

    /// Feature-derived values that replace user input
    fn computed(&self, _ctx: &ResolveContext<'_>) -> FlagMap {
        FlagMap::new()
    }

    /// Values that are never user-overridable
    fn static_flags(&self, ctx: &ResolveContext<'_>, os: OsType) -> FlagMap;

    /// Remove keys the version or feature set doesn't accept
    fn prune(&self, _ctx: &ResolveContext<'_>, _flags: &mut FlagMap) {}

    /// Cross-cutting rules applied after pruning
    fn finalize(&self, _ctx: &ResolveContext<'_>, _flags: &mut FlagMap) {}
}

/// Build the layer set for a component without resolving it
pub fn layered_flags(
    rules: &dyn ComponentRules,
    user: Option<&FlagMap>,
    ctx: &ResolveContext<'_>,
    os: OsType,
) -> LayeredFlags {
    LayeredFlags::new()
        .with_layer(LayerKind::Default, rules.defaults(ctx))
        .with_optional_layer(LayerKind::User, user)
        .with_layer(LayerKind::Computed, rules.computed(ctx))
        .with_layer(LayerKind::Static, rules.static_flags(ctx, os))
}

/// Resolve a component's flags
///
/// Resolution is total: missing upstream values become empty strings.
pub fn resolve_component(
    component: Component,
    user: Option<&FlagMap>,
    ctx: &ResolveContext<'_>,
    os: OsType,
) -> FlagMap {
    resolve_with_rules(component.rules(), user, ctx, os)
}

pub(crate) fn resolve_with_rules(
    rules: &dyn ComponentRules,
    user: Option<&FlagMap>,
    ctx: &ResolveContext<'_>,
    os: OsType,
) -> FlagMap {
    let mut flags = layered_flags(rules, user, ctx, os).resolve();
    rules.prune(ctx, &mut flags);
    rules.finalize(ctx, &mut flags);
    flags
}

/// Static values that survive pruning for a component
pub fn effective_static_flags(component: Component, ctx: &ResolveContext<'_>, os: OsType) -> FlagMap {
    let rules = component.rules();
    let mut flags = rules.static_flags(ctx, os);
    rules.prune(ctx, &mut flags);
    flags
}

/// Cloud provider flags shared by components when the cloud-controller-manager is not used
pub(crate) fn in_tree_cloud_provider(ctx: &ResolveContext<'_>, flags: &mut FlagMap) {
    if !ctx.kubernetes().uses_cloud_controller_manager() {
        flags.insert("--cloud-provider".to_string(), "azure".to_string());
        flags.insert("--cloud-config".to_string(), CLOUD_CONFIG_PATH.to_string());
    }
}

/// Name used to tag cloud resources, empty without a master profile
pub(crate) fn cluster_name(ctx: &ResolveContext<'_>) -> String {
    ctx.definition
        .master_profile
        .as_ref()
        .map(|m| m.dns_prefix.clone())
        .unwrap_or_default()
}

/// Controllers program routes unless the network plugin routes pods itself
pub(crate) fn requires_route_table(ctx: &ResolveContext<'_>) -> bool {
    let k8s = ctx.kubernetes();
    !k8s.is_azure_cni() && k8s.network_policy != "cilium"
}


#[cfg(test)]
mod tests {
    use super::test_support::cluster;
    use super::*;
    use keel_common::flags::flag_map;
    use keel_common::EngineConfig;
    use rstest::rstest;

    fn hostile_user_flags(component: Component, ctx: &ResolveContext<'_>) -> FlagMap {
        // every static key set to a conflicting value, plus a user-only key
        let mut user: FlagMap = effective_static_flags(component, ctx, OsType::Linux)
            .into_keys()
            .map(|k| (k, "user-value".to_string()))
            .collect();
        user.insert("--user-only".to_string(), "kept".to_string());
        user
    }

    #[rstest]
    fn static_values_always_win(
        #[values(
            Component::ApiServer,
            Component::ControllerManager,
            Component::CloudControllerManager,
            Component::Scheduler,
            Component::Kubelet
        )]
        component: Component,
        #[values("1.7.9", "1.9.6", "1.10.3", "1.11.2")] version: &str,
        #[values(OsType::Linux, OsType::Windows)] os: OsType,
    ) {
        let def = cluster(version);
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, version, &engine);
        let user = hostile_user_flags(component, &ctx);

        let resolved = resolve_component(component, Some(&user), &ctx, os);

        for (key, value) in effective_static_flags(component, &ctx, os) {
            assert_eq!(resolved.get(&key), Some(&value), "{component} {key}");
        }
        assert_eq!(resolved["--user-only"], "kept");
    }

    #[rstest]
    fn user_keys_outside_static_set_are_preserved(
        #[values(
            Component::ApiServer,
            Component::ControllerManager,
            Component::Scheduler,
            Component::Kubelet
        )]
        component: Component,
    ) {
        let def = cluster("1.9.6");
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.9.6", &engine);
        let user = flag_map([("--v", "7"), ("--custom-flag", "x")]);
        let statics = effective_static_flags(component, &ctx, OsType::Linux);

        let resolved = resolve_component(component, Some(&user), &ctx, OsType::Linux);

        for (key, value) in &user {
            if !statics.contains_key(key) {
                assert_eq!(resolved.get(key), Some(value), "{component} {key}");
            }
        }
    }

    #[test]
    fn scheduler_kubeconfig_override_is_ignored() {
        let def = cluster("1.9.6");
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.9.6", &engine);
        let user = flag_map([("--kubeconfig", "user-override")]);

        let resolved = resolve_component(Component::Scheduler, Some(&user), &ctx, OsType::Linux);

        assert_eq!(
            resolved,
            flag_map([
                ("--kubeconfig", "/var/lib/kubelet/kubeconfig"),
                ("--leader-elect", "true"),
                ("--profiling", "false"),
                ("--v", "2"),
            ])
        );
    }

    #[test]
    fn layer_sources_are_reported() {
        let def = cluster("1.9.6");
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.9.6", &engine);
        let user = flag_map([("--kubeconfig", "user-override")]);

        let layered = layered_flags(component_rules(), Some(&user), &ctx, OsType::Linux);
        assert_eq!(layered.source_of("--kubeconfig"), Some(LayerKind::Static));
        assert_eq!(layered.source_of("--v"), Some(LayerKind::Default));
    }

    fn component_rules() -> &'static dyn ComponentRules {
        Component::Scheduler.rules()
    }
}
