//! Transforms for resubmitting a template during an orchestrator upgrade

use std::collections::BTreeSet;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::graph::{references, resource_name, resource_type, DeploymentGraph};
use crate::scale::{normalize_for_availability_set_scale_up, single_nsg_index};
use crate::{
    is_master_name, CREATE_OPTION, DATA_DISKS, MANAGED_DISK, MASTER_ETCD_DISK_ID,
    POOL_NAME_TAG, PROPERTIES, STORAGE_PROFILE, TAGS, VM_EXTENSION_RESOURCE_TYPE,
    VM_RESOURCE_TYPE,
};

/// How an upgrade treats existing disks and agent pools
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Masters use managed disks, so the etcd disk is attached by id
    pub managed_disk: bool,
    /// Agent pools whose VMs stay in the template; `None` preserves none
    ///
    /// NICs are never removed, so agents of dropped pools come back on their
    /// existing interfaces.
    pub pools_to_preserve: Option<BTreeSet<String>>,
}

impl UpgradeOptions {
    /// Options preserving the named pools
    pub fn preserving<I, S>(pools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            managed_disk: false,
            pools_to_preserve: Some(pools.into_iter().map(Into::into).collect()),
        }
    }

    fn preserves(&self, pool: &str) -> bool {
        self.pools_to_preserve
            .as_ref()
            .is_some_and(|pools| pools.contains(pool))
    }
}

enum Disposition {
    Keep,
    Remove,
}

/// Prepare a template for upgrading masters
///
/// Master etcd data disks are reattached instead of recreated. Agent VMs
/// whose `poolName` tag is not preserved are removed together with their
/// extensions, and `dependsOn` entries pointing at removed resources are
/// dropped. Network interfaces are left in place.
pub fn normalize_for_master_upgrade(
    graph: &mut DeploymentGraph,
    options: &UpgradeOptions,
) -> Result<()> {
    let before = graph.len();

    let resources = std::mem::take(graph.resources_mut());
    let mut kept = Vec::with_capacity(resources.len());
    let mut removed = Vec::new();
    for (index, mut resource) in resources.into_iter().enumerate() {
        match upgrade_disposition(index, &mut resource, options) {
            Disposition::Keep => kept.push(resource),
            Disposition::Remove => removed.push(resource),
        }
    }
    *graph.resources_mut() = kept;

    let pruned = if removed.is_empty() {
        0
    } else {
        graph.prune_dependencies(|dep| removed.iter().any(|r| references(dep, r)))
    };

    info!(
        before,
        after = graph.len(),
        pruned,
        "normalized template for master upgrade"
    );
    Ok(())
}

/// Prepare a template for upgrading agents
///
/// Master upgrade normalization followed by the availability-set scale-up
/// transform. The security group count is checked first, so a template that
/// would fail the scale-up step is not modified at all.
pub fn normalize_for_agent_upgrade(
    graph: &mut DeploymentGraph,
    options: &UpgradeOptions,
) -> Result<()> {
    single_nsg_index(graph)?;
    normalize_for_master_upgrade(graph, options)?;
    normalize_for_availability_set_scale_up(graph)
}

fn upgrade_disposition(index: usize, resource: &mut Value, options: &UpgradeOptions) -> Disposition {
    if !resource.is_object() {
        warn!(index, "resource is not an object, skipping");
        return Disposition::Keep;
    }
    let Some(kind) = resource_type(resource).map(str::to_string) else {
        return Disposition::Keep;
    };
    if kind != VM_RESOURCE_TYPE && kind != VM_EXTENSION_RESOURCE_TYPE {
        return Disposition::Keep;
    }
    let Some(name) = resource_name(resource).map(str::to_string) else {
        warn!(index, resource_type = %kind, "resource has no name, skipping");
        return Disposition::Keep;
    };
    let master = is_master_name(&name);

    match kind.as_str() {
        VM_RESOURCE_TYPE if master => {
            attach_etcd_disk(index, &name, resource, options.managed_disk);
            Disposition::Keep
        }
        VM_RESOURCE_TYPE => {
            let pool = resource
                .get(TAGS)
                .and_then(|t| t.get(POOL_NAME_TAG))
                .and_then(Value::as_str);
            match pool {
                Some(pool) if !options.preserves(pool) => {
                    debug!(index, resource = %name, pool, "removing agent VM");
                    Disposition::Remove
                }
                _ => Disposition::Keep,
            }
        }
        VM_EXTENSION_RESOURCE_TYPE if !master => {
            let preserved = options.pools_to_preserve.iter().flatten().any(|pool| {
                name.contains(&format!("variables('{}", pool))
            });
            if preserved {
                Disposition::Keep
            } else {
                debug!(index, resource = %name, "removing agent extension");
                Disposition::Remove
            }
        }
        _ => Disposition::Keep,
    }
}

fn attach_etcd_disk(index: usize, name: &str, resource: &mut Value, managed_disk: bool) {
    let disk = resource
        .get_mut(PROPERTIES)
        .and_then(|p| p.get_mut(STORAGE_PROFILE))
        .and_then(|s| s.get_mut(DATA_DISKS))
        .and_then(Value::as_array_mut)
        .and_then(|disks| disks.first_mut())
        .and_then(Value::as_object_mut);

    let Some(disk) = disk else {
        warn!(index, resource = %name, "master VM has no etcd data disk, skipping");
        return;
    };

    disk.insert(CREATE_OPTION.to_string(), json!("attach"));
    if managed_disk {
        disk.insert(MANAGED_DISK.to_string(), json!({ "id": MASTER_ETCD_DISK_ID }));
    }
}
