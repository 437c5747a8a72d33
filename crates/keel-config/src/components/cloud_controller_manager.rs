//! cloud-controller-manager flags

use keel_common::flags::flag_map;
use keel_common::{FlagMap, OsType};

use super::{cluster_name, requires_route_table, ComponentRules, CLOUD_CONFIG_PATH, KUBECONFIG_PATH};
use crate::ResolveContext;

/// cloud-controller-manager rules
#[derive(Clone, Copy, Debug, Default)]
pub struct CloudControllerManagerRules;

impl ComponentRules for CloudControllerManagerRules {
    fn defaults(&self, _ctx: &ResolveContext<'_>) -> FlagMap {
        flag_map([("--route-reconciliation-period", "10s")])
    }

    fn static_flags(&self, ctx: &ResolveContext<'_>, _os: OsType) -> FlagMap {
        let k8s = ctx.kubernetes();
        flag_map([
            ("--allocate-node-cidrs", (!k8s.is_azure_cni()).to_string()),
            ("--configure-cloud-routes", requires_route_table(ctx).to_string()),
            ("--cloud-provider", "azure".to_string()),
            ("--cloud-config", CLOUD_CONFIG_PATH.to_string()),
            ("--cluster-cidr", k8s.cluster_subnet.clone()),
            ("--kubeconfig", KUBECONFIG_PATH.to_string()),
            ("--leader-elect", "true".to_string()),
            ("--v", "2".to_string()),
            ("--cluster-name", cluster_name(ctx)),
        ])
    }
}
