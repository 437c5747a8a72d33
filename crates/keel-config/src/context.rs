//! Inputs shared by every resolution step

use keel_common::{ClusterDefinition, EngineConfig, KubernetesConfig};
use keel_versions::is_version_at_least;

/// Read-only view of what a resolver needs
#[derive(Clone, Copy, Debug)]
pub struct ResolveContext<'a> {
    /// Cluster definition with defaults applied
    pub definition: &'a ClusterDefinition,
    /// Rationalized orchestrator version
    pub version: &'a str,
    /// Injected lookup tables
    pub engine: &'a EngineConfig,
}

impl<'a> ResolveContext<'a> {
    /// Create a context
    pub fn new(definition: &'a ClusterDefinition, version: &'a str, engine: &'a EngineConfig) -> Self {
        Self {
            definition,
            version,
            engine,
        }
    }

    /// Kubernetes configuration of the cluster
    pub fn kubernetes(&self) -> &'a KubernetesConfig {
        &self.definition.orchestrator_profile.kubernetes_config
    }

    /// Version is at or above `floor`
    pub fn at_least(&self, floor: &str) -> bool {
        is_version_at_least(self.version, floor)
    }

    /// Registry prefix for component images
    pub fn image_base(&self) -> &'a str {
        let base = &self.kubernetes().kubernetes_image_base;
        if base.is_empty() {
            &self.engine.kubernetes_image_base
        } else {
            base
        }
    }

    /// Fully qualified image of a catalog component, empty when unknown
    pub fn component_image(&self, component: &str) -> String {
        match self.engine.component_images.image(self.version, component) {
            Some(image) => format!("{}{}", self.image_base(), image),
            None => String::new(),
        }
    }

    /// Raw catalog value for a component key
    pub fn catalog_value(&self, key: &str) -> Option<&'a str> {
        self.engine.component_images.image(self.version, key)
    }
}
