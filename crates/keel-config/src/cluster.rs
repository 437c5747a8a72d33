//! Whole-cluster resolution

use std::collections::BTreeMap;

use keel_common::flags::render_flags;
use keel_common::{AddonSpec, ClusterDefinition, EngineConfig, FlagMap, OrchestratorType, OsType};
use keel_versions::rationalize_release_and_version;
use serde::Serialize;
use tracing::{debug, info};

use crate::addons::{resolve_and_synthesize, AddonCatalog};
use crate::components::{
    resolve_cluster_kubelet, resolve_component, resolve_role_kubelet, Component, KubeletRole,
};
use crate::defaults::apply_cluster_defaults;
use crate::{ConfigError, ResolveContext, Result};

/// Options for whole-cluster resolution
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// The definition describes an existing cluster being updated
    pub is_update: bool,
}

/// Fully resolved configuration of a cluster
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCluster {
    /// Rationalized orchestrator version
    pub orchestrator_version: String,
    /// kube-apiserver flags
    pub api_server: FlagMap,
    /// kube-controller-manager flags
    pub controller_manager: FlagMap,
    /// cloud-controller-manager flags, when one is deployed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_controller_manager: Option<FlagMap>,
    /// kube-scheduler flags
    pub scheduler: FlagMap,
    /// Cluster-wide kubelet flags
    pub kubelet: FlagMap,
    /// Master kubelet flags, when the cluster has masters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_kubelet: Option<FlagMap>,
    /// Kubelet flags per agent pool
    pub agent_kubelets: BTreeMap<String, FlagMap>,
    /// Finalized addons
    pub addons: Vec<AddonSpec>,
}

impl ResolvedCluster {
    /// Flags of every component rendered as `key=value` strings
    pub fn rendered_flags(&self) -> BTreeMap<String, String> {
        let mut rendered = BTreeMap::new();
        rendered.insert(Component::ApiServer.to_string(), render_flags(&self.api_server));
        rendered.insert(
            Component::ControllerManager.to_string(),
            render_flags(&self.controller_manager),
        );
        if let Some(ccm) = &self.cloud_controller_manager {
            rendered.insert(Component::CloudControllerManager.to_string(), render_flags(ccm));
        }
        rendered.insert(Component::Scheduler.to_string(), render_flags(&self.scheduler));
        rendered.insert(Component::Kubelet.to_string(), render_flags(&self.kubelet));
        if let Some(master) = &self.master_kubelet {
            rendered.insert("kubelet/master".to_string(), render_flags(master));
        }
        for (pool, flags) in &self.agent_kubelets {
            rendered.insert(format!("kubelet/{pool}"), render_flags(flags));
        }
        rendered
    }
}

/// Resolve every component, role, and addon of a Kubernetes cluster
pub fn resolve_cluster(
    definition: &ClusterDefinition,
    engine: &EngineConfig,
    options: ResolveOptions,
) -> Result<ResolvedCluster> {
    let profile = &definition.orchestrator_profile;
    if profile.orchestrator_type != OrchestratorType::Kubernetes {
        return Err(ConfigError::UnsupportedOrchestrator {
            orchestrator: profile.orchestrator_type.to_string(),
        });
    }

    let version = rationalize_release_and_version(
        profile.orchestrator_type,
        &profile.orchestrator_release,
        &profile.orchestrator_version,
        options.is_update,
        definition.has_windows(),
    )?;
    let definition = apply_cluster_defaults(definition, &version, engine);
    let ctx = ResolveContext::new(&definition, &version, engine);

    let resolve = |component: Component| {
        let flags = resolve_component(component, component.user_flags(&ctx), &ctx, OsType::Linux);
        debug!(%component, flags = flags.len(), "resolved component flags");
        flags
    };

    let kubelet = resolve_cluster_kubelet(&ctx);
    let master_kubelet = definition
        .master_profile
        .as_ref()
        .map(|_| resolve_role_kubelet(&kubelet, KubeletRole::Master, &ctx));
    let agent_kubelets = definition
        .agent_pool_profiles
        .iter()
        .map(|pool| {
            (
                pool.name.clone(),
                resolve_role_kubelet(&kubelet, KubeletRole::Agent(pool), &ctx),
            )
        })
        .collect();

    let defaults = AddonCatalog::builtin().defaults_for(&ctx);
    let addons = resolve_and_synthesize(
        definition.orchestrator_profile.kubernetes_config.addons.as_deref(),
        &defaults,
    );

    let resolved = ResolvedCluster {
        orchestrator_version: version.clone(),
        api_server: resolve(Component::ApiServer),
        controller_manager: resolve(Component::ControllerManager),
        cloud_controller_manager: ctx
            .kubernetes()
            .uses_cloud_controller_manager()
            .then(|| resolve(Component::CloudControllerManager)),
        scheduler: resolve(Component::Scheduler),
        kubelet,
        master_kubelet,
        agent_kubelets,
        addons,
    };

    info!(
        version = %resolved.orchestrator_version,
        agent_pools = resolved.agent_kubelets.len(),
        addons = resolved.addons.len(),
        "resolved cluster configuration"
    );
    Ok(resolved)
}
