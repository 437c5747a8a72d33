//! Addon declarations

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Tristate;

/// An optional cluster component with its own enablement and resource defaults
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    /// Unique addon name (e.g., "tiller")
    pub name: String,
    /// Whether the addon is deployed
    #[serde(default, skip_serializing_if = "Tristate::is_unset")]
    pub enabled: Tristate,
    /// Containers making up the addon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerSpec>,
    /// Free-form addon configuration
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

impl AddonSpec {
    /// Create an addon with only a name and enablement
    pub fn new(name: impl Into<String>, enabled: Tristate) -> Self {
        Self {
            name: name.into(),
            enabled,
            ..Default::default()
        }
    }

    /// Add a container
    pub fn with_container(mut self, container: ContainerSpec) -> Self {
        self.containers.push(container);
        self
    }

    /// Add a config entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Find a container by name
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// Image and resource settings of one addon container
///
/// Empty strings mean "not set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    /// Container name, unique within the addon
    pub name: String,
    /// Container image reference
    #[serde(default)]
    pub image: String,
    /// CPU request (e.g., "50m")
    #[serde(default)]
    pub cpu_requests: String,
    /// Memory request (e.g., "150Mi")
    #[serde(default)]
    pub memory_requests: String,
    /// CPU limit
    #[serde(default)]
    pub cpu_limits: String,
    /// Memory limit
    #[serde(default)]
    pub memory_limits: String,
}

impl ContainerSpec {
    /// Container with requests equal to limits
    pub fn with_resources(name: impl Into<String>, cpu: &str, memory: &str) -> Self {
        Self {
            name: name.into(),
            image: String::new(),
            cpu_requests: cpu.to_string(),
            memory_requests: memory.to_string(),
            cpu_limits: cpu.to_string(),
            memory_limits: memory.to_string(),
        }
    }
}
