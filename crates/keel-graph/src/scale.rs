//! Transforms for resubmitting a template to add capacity

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{GraphError, Result};
use crate::graph::{references, resource_name, resource_type, DeploymentGraph};
use crate::{
    is_master_name, CUSTOM_DATA, HARDWARE_PROFILE, IMAGE_REFERENCE, NSG_RESOURCE_TYPE,
    OS_PROFILE, PROPERTIES, STORAGE_PROFILE, VIRTUAL_MACHINE_PROFILE, VMSS_RESOURCE_TYPE,
    VM_RESOURCE_TYPE, VM_SIZE,
};

/// Stop resubmission from resizing or reprovisioning master VMs
///
/// For every master VM, removes `hardwareProfile.vmSize`,
/// `osProfile.customData` and `storageProfile.imageReference`. A master VM
/// missing any of those profiles is logged and left untouched.
pub fn normalize_master_resources_for_scaling(graph: &mut DeploymentGraph) -> Result<()> {
    let mut normalized = 0;
    for (index, resource) in graph.resources_mut().iter_mut().enumerate() {
        if !resource.is_object() {
            warn!(index, "resource is not an object, skipping");
            continue;
        }
        if resource_type(resource) != Some(VM_RESOURCE_TYPE) {
            continue;
        }
        let Some(name) = resource_name(resource) else {
            warn!(index, "virtual machine has no name, skipping");
            continue;
        };
        if !is_master_name(name) {
            continue;
        }
        let name = name.to_string();

        let Some(properties) = resource.get_mut(PROPERTIES).and_then(Value::as_object_mut) else {
            warn!(index, resource = %name, "master VM has no properties, skipping");
            continue;
        };
        if !has_objects(properties, &[HARDWARE_PROFILE, OS_PROFILE, STORAGE_PROFILE]) {
            warn!(index, resource = %name, "master VM profiles are malformed, skipping");
            continue;
        }

        remove_nested(properties, HARDWARE_PROFILE, VM_SIZE);
        remove_nested(properties, OS_PROFILE, CUSTOM_DATA);
        remove_nested(properties, STORAGE_PROFILE, IMAGE_REFERENCE);
        normalized += 1;
    }
    debug!(normalized, "normalized master VMs for scaling");
    Ok(())
}

/// Prepare a template for a scale-set capacity change
///
/// Runs master normalization, then removes `customData` and
/// `imageReference` from every scale set's VM profile so running instances
/// are neither reimaged nor rebootstrapped.
pub fn normalize_for_scale_set(graph: &mut DeploymentGraph) -> Result<()> {
    normalize_master_resources_for_scaling(graph)?;

    for (index, resource) in graph.resources_mut().iter_mut().enumerate() {
        if resource_type(resource) != Some(VMSS_RESOURCE_TYPE) {
            continue;
        }
        let Some(profile) = resource
            .get_mut(PROPERTIES)
            .and_then(|p| p.get_mut(VIRTUAL_MACHINE_PROFILE))
            .and_then(Value::as_object_mut)
        else {
            warn!(index, "scale set has no virtualMachineProfile, skipping");
            continue;
        };
        if !has_objects(profile, &[OS_PROFILE, STORAGE_PROFILE]) {
            warn!(index, "scale set VM profile is malformed, skipping");
            continue;
        }

        remove_nested(profile, OS_PROFILE, CUSTOM_DATA);
        remove_nested(profile, STORAGE_PROFILE, IMAGE_REFERENCE);
    }
    Ok(())
}

/// Prepare a template for adding availability-set agents
///
/// The template must hold exactly one network security group; any other
/// count is an error and the graph is left unmodified. Otherwise master VMs
/// are normalized, the security group is removed, and every `dependsOn`
/// entry referencing it is dropped. One-shot: a second run finds no security
/// group and fails.
pub fn normalize_for_availability_set_scale_up(graph: &mut DeploymentGraph) -> Result<()> {
    let nsg_index = single_nsg_index(graph)?;

    normalize_master_resources_for_scaling(graph)?;

    let nsg = graph.resources_mut().remove(nsg_index);
    let pruned = graph
        .prune_dependencies(|dep| dep.contains(NSG_RESOURCE_TYPE) || references(dep, &nsg));

    info!(
        nsg = resource_name(&nsg).unwrap_or_default(),
        pruned, "removed network security group for scale-up"
    );
    Ok(())
}

pub(crate) fn single_nsg_index(graph: &DeploymentGraph) -> Result<usize> {
    match graph.indexes_of_type(NSG_RESOURCE_TYPE).as_slice() {
        [index] => Ok(*index),
        indexes => {
            let err = GraphError::UnexpectedNsgCount {
                count: indexes.len(),
                resource_type: NSG_RESOURCE_TYPE,
            };
            warn!(error = %err, "refusing to transform template");
            Err(err)
        }
    }
}

fn has_objects(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .all(|key| map.get(*key).is_some_and(Value::is_object))
}

fn remove_nested(map: &mut Map<String, Value>, outer: &str, field: &str) {
    if let Some(inner) = map.get_mut(outer).and_then(Value::as_object_mut) {
        inner.remove(field);
    }
}
