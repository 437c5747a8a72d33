//! kube-controller-manager flags

use keel_common::flags::{add_feature_gates, flag_map};
use keel_common::{FlagMap, OsType};

use super::{
    cluster_name, in_tree_cloud_provider, requires_route_table, ComponentRules, CA_CERT_PATH,
    KUBECONFIG_PATH,
};
use crate::ResolveContext;

/// Flag RBAC forces on so each controller runs under its own service account
pub const USE_SERVICE_ACCOUNT_CREDENTIALS: &str = "--use-service-account-credentials";

/// kube-controller-manager rules
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerManagerRules;

impl ComponentRules for ControllerManagerRules {
    fn defaults(&self, _ctx: &ResolveContext<'_>) -> FlagMap {
        flag_map([
            ("--node-monitor-grace-period", "40s"),
            ("--pod-eviction-timeout", "5m0s"),
            ("--route-reconciliation-period", "10s"),
            ("--terminated-pod-gc-threshold", "5000"),
            (USE_SERVICE_ACCOUNT_CREDENTIALS, "false"),
        ])
    }

    fn static_flags(&self, ctx: &ResolveContext<'_>, _os: OsType) -> FlagMap {
        let k8s = ctx.kubernetes();
        let mut flags = flag_map([
            ("--kubeconfig", KUBECONFIG_PATH.to_string()),
            ("--allocate-node-cidrs", (!k8s.is_azure_cni()).to_string()),
            ("--configure-cloud-routes", requires_route_table(ctx).to_string()),
            ("--cluster-cidr", k8s.cluster_subnet.clone()),
            ("--root-ca-file", CA_CERT_PATH.to_string()),
            ("--cluster-signing-cert-file", CA_CERT_PATH.to_string()),
            (
                "--cluster-signing-key-file",
                "/etc/kubernetes/certs/ca.key".to_string(),
            ),
            (
                "--service-account-private-key-file",
                "/etc/kubernetes/certs/apiserver.key".to_string(),
            ),
            ("--leader-elect", "true".to_string()),
            ("--v", "2".to_string()),
            ("--profiling", "false".to_string()),
            ("--cluster-name", cluster_name(ctx)),
        ]);
        in_tree_cloud_provider(ctx, &mut flags);
        flags
    }

    fn finalize(&self, ctx: &ResolveContext<'_>, flags: &mut FlagMap) {
        if ctx.at_least("1.9.0") {
            add_feature_gates(flags, "ServiceNodeExclusion=true");
        }
        if ctx.kubernetes().rbac_enabled() {
            flags.insert(USE_SERVICE_ACCOUNT_CREDENTIALS.to_string(), "true".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::test_support::cluster;
    use crate::components::{resolve_component, Component};
    use keel_common::EngineConfig;

    #[test]
    fn rbac_forces_service_account_credentials() {
        let mut def = cluster("1.9.6");
        def.orchestrator_profile.kubernetes_config.enable_rbac = Some(true);
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.9.6", &engine);
        let user = flag_map([(USE_SERVICE_ACCOUNT_CREDENTIALS, "false")]);

        let flags = resolve_component(Component::ControllerManager, Some(&user), &ctx, OsType::Linux);

        assert_eq!(flags[USE_SERVICE_ACCOUNT_CREDENTIALS], "true");
    }

    #[test]
    fn without_rbac_default_is_false() {
        let mut def = cluster("1.9.6");
        def.orchestrator_profile.kubernetes_config.enable_rbac = Some(false);
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.9.6", &engine);

        let flags = resolve_component(Component::ControllerManager, None, &ctx, OsType::Linux);

        assert_eq!(flags[USE_SERVICE_ACCOUNT_CREDENTIALS], "false");
    }

    #[test]
    fn feature_gates_merge_with_user_gates() {
        let def = cluster("1.10.3");
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.10.3", &engine);
        let user = flag_map([("--feature-gates", "PodPriority=true")]);

        let flags = resolve_component(Component::ControllerManager, Some(&user), &ctx, OsType::Linux);

        assert_eq!(
            flags["--feature-gates"],
            "PodPriority=true,ServiceNodeExclusion=true"
        );
    }

    #[test]
    fn no_feature_gates_before_1_9() {
        let def = cluster("1.8.15");
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.8.15", &engine);

        let flags = resolve_component(Component::ControllerManager, None, &ctx, OsType::Linux);

        assert!(!flags.contains_key("--feature-gates"));
        assert_eq!(flags["--cloud-provider"], "azure");
    }

    #[test]
    fn cloud_controller_manager_removes_in_tree_provider() {
        let mut def = cluster("1.10.3");
        def.orchestrator_profile.kubernetes_config.use_cloud_controller_manager = Some(true);
        let engine = EngineConfig::default();
        let ctx = ResolveContext::new(&def, "1.10.3", &engine);

        let flags = resolve_component(Component::ControllerManager, None, &ctx, OsType::Linux);

        assert!(!flags.contains_key("--cloud-provider"));
        assert!(!flags.contains_key("--cloud-config"));
    }
}
