//! Addon resolution
//!
//! User addons are merged with the built-in catalog by name, then every
//! enabled addon that has a catalog counterpart is synthesized: empty fields
//! are filled from the default, populated fields are left alone.

mod catalog;

pub use catalog::{
    AddonCatalog, CatalogEntry, ContainerDefault, Enablement, ImageSource, ACI_CONNECTOR,
    AZURE_CNI_NETWORK_MONITOR, AZURE_NPM_DAEMONSET, BLOBFUSE_FLEXVOLUME, CLUSTER_AUTOSCALER,
    CONTAINER_MONITORING, DASHBOARD, IP_MASQ_AGENT, KEYVAULT_FLEXVOLUME, METRICS_SERVER,
    NVIDIA_DEVICE_PLUGIN, RESCHEDULER, SMB_FLEXVOLUME, TILLER,
};

use keel_common::{AddonSpec, ContainerSpec, Tristate};
use tracing::debug;

/// Merge user addons with catalog defaults by name
///
/// User entries keep their position and content. Defaults the user didn't
/// mention are appended as-is.
pub fn resolve_addons(user: Option<&[AddonSpec]>, defaults: &[AddonSpec]) -> Vec<AddonSpec> {
    let mut addons = user.map(<[AddonSpec]>::to_vec).unwrap_or_default();
    for default in defaults {
        if !addons.iter().any(|a| a.name == default.name) {
            addons.push(default.clone());
        }
    }
    addons
}

/// Whether an addon is deployed, given its catalog default
pub fn is_addon_enabled(addon: &AddonSpec, default: &AddonSpec) -> bool {
    addon.enabled.resolve(default.enabled == Tristate::Enabled)
}

/// Fill an addon's empty fields from its catalog default
///
/// Only empty fields are written, so applying this to its own output changes
/// nothing.
pub fn synthesize_addon(addon: &AddonSpec, default: &AddonSpec) -> AddonSpec {
    let mut synthesized = addon.clone();

    if synthesized.enabled.is_unset() {
        synthesized.enabled = default.enabled;
    }

    for default_container in &default.containers {
        match synthesized
            .containers
            .iter_mut()
            .find(|c| c.name == default_container.name)
        {
            Some(container) => fill_container(container, default_container),
            None => synthesized.containers.push(default_container.clone()),
        }
    }

    for (key, value) in &default.config {
        let entry = synthesized.config.entry(key.clone()).or_default();
        if entry.is_empty() {
            entry.clone_from(value);
        }
    }

    synthesized
}

fn fill_container(container: &mut ContainerSpec, default: &ContainerSpec) {
    let fields = [
        (&mut container.image, &default.image),
        (&mut container.cpu_requests, &default.cpu_requests),
        (&mut container.memory_requests, &default.memory_requests),
        (&mut container.cpu_limits, &default.cpu_limits),
        (&mut container.memory_limits, &default.memory_limits),
    ];
    for (field, value) in fields {
        if field.is_empty() {
            field.clone_from(value);
        }
    }
}

/// Merge, then synthesize every enabled addon that has a catalog default
///
/// Disabled addons and addons unknown to the catalog pass through untouched.
pub fn resolve_and_synthesize(user: Option<&[AddonSpec]>, defaults: &[AddonSpec]) -> Vec<AddonSpec> {
    resolve_addons(user, defaults)
        .into_iter()
        .map(|addon| match defaults.iter().find(|d| d.name == addon.name) {
            Some(default) if is_addon_enabled(&addon, default) => {
                debug!(addon = %addon.name, "synthesizing addon from defaults");
                synthesize_addon(&addon, default)
            }
            _ => addon,
        })
        .collect()
}
