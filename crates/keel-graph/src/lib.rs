//! Deployment graph transforms for keel
//!
//! Rewrites an already rendered deployment template so it can be resubmitted
//! safely: to add capacity without reimaging running machines, or to upgrade
//! masters and agents without recreating resources that must survive.
//!
//! All transforms mutate the graph in place and are one-shot. Running one
//! twice is not a no-op: the availability-set scale-up removes the single
//! network security group, so a second run fails its count check.

#![deny(missing_docs)]

pub mod error;
pub mod graph;
pub mod scale;
pub mod upgrade;

pub use error::{GraphError, Result};
pub use graph::{dangling_dependencies, DanglingDependency, DeploymentGraph};
pub use scale::{
    normalize_for_availability_set_scale_up, normalize_for_scale_set,
    normalize_master_resources_for_scaling,
};
pub use upgrade::{normalize_for_agent_upgrade, normalize_for_master_upgrade, UpgradeOptions};

// Template field names
pub(crate) const RESOURCES: &str = "resources";
pub(crate) const TYPE: &str = "type";
pub(crate) const NAME: &str = "name";
pub(crate) const PROPERTIES: &str = "properties";
pub(crate) const DEPENDS_ON: &str = "dependsOn";
pub(crate) const TAGS: &str = "tags";
pub(crate) const HARDWARE_PROFILE: &str = "hardwareProfile";
pub(crate) const VM_SIZE: &str = "vmSize";
pub(crate) const OS_PROFILE: &str = "osProfile";
pub(crate) const CUSTOM_DATA: &str = "customData";
pub(crate) const STORAGE_PROFILE: &str = "storageProfile";
pub(crate) const IMAGE_REFERENCE: &str = "imageReference";
pub(crate) const DATA_DISKS: &str = "dataDisks";
pub(crate) const CREATE_OPTION: &str = "createOption";
pub(crate) const MANAGED_DISK: &str = "managedDisk";
pub(crate) const VIRTUAL_MACHINE_PROFILE: &str = "virtualMachineProfile";
pub(crate) const POOL_NAME_TAG: &str = "poolName";

/// Network security group resource type
pub const NSG_RESOURCE_TYPE: &str = "Microsoft.Network/networkSecurityGroups";
/// Route table resource type
pub const ROUTE_TABLE_RESOURCE_TYPE: &str = "Microsoft.Network/routeTables";
/// Virtual network resource type
pub const VNET_RESOURCE_TYPE: &str = "Microsoft.Network/virtualNetworks";
/// Network interface resource type
pub const NIC_RESOURCE_TYPE: &str = "Microsoft.Network/networkInterfaces";
/// Virtual machine resource type
pub const VM_RESOURCE_TYPE: &str = "Microsoft.Compute/virtualMachines";
/// Virtual machine extension resource type
pub const VM_EXTENSION_RESOURCE_TYPE: &str = "Microsoft.Compute/virtualMachines/extensions";
/// Virtual machine scale set resource type
pub const VMSS_RESOURCE_TYPE: &str = "Microsoft.Compute/virtualMachineScaleSets";

/// Fragment every master resource name contains
pub const MASTER_NAME_PATTERN: &str = "variables('masterVMNamePrefix')";

/// Managed disk id of a master's etcd data disk
pub const MASTER_ETCD_DISK_ID: &str = "[concat('/subscriptions/', variables('subscriptionId'), '/resourceGroups/', variables('resourceGroup'),'/providers/Microsoft.Compute/disks/', variables('masterVMNamePrefix'), copyIndex(variables('masterOffset')),'-etcddisk')]";

pub(crate) fn is_master_name(name: &str) -> bool {
    name.contains(MASTER_NAME_PATTERN)
}
