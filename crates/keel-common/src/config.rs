//! Engine configuration
//!
//! Lookup tables that the resolvers consult, loaded once at startup and passed
//! around by reference.
//!
//! The configuration file resolution chain (highest priority first):
//! 1. Explicit `--config` flag
//! 2. `KEEL_CONFIG` environment variable
//! 3. Built-in defaults
//!
//! Files are YAML; JSON files are accepted as well.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, CONFIG_ENV_VAR, DEFAULT_CLUSTER_DOMAIN};

/// Image key of the pod infrastructure container
pub const PAUSE_IMAGE: &str = "pause";

/// Key holding the kubelet node status update frequency
pub const NODE_STATUS_FREQUENCY: &str = "nodestatusfreq";

/// Per-version component images, keyed by `major.minor` or exact version
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ImageCatalog(BTreeMap<String, BTreeMap<String, String>>);

impl ImageCatalog {
    /// Create a catalog from a version -> component -> image map
    pub fn new(images: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self(images)
    }

    /// Catalog bundled with the binary
    pub fn builtin() -> Self {
        let releases: [(&str, &str, &str, &str, &str); 6] = [
            ("1.6", "v2.8.1", "v1.6.3", "v0.3.1", "heapster-amd64:v1.3.0"),
            ("1.7", "v2.8.1", "v1.6.3", "v0.3.1", "heapster-amd64:v1.4.2"),
            ("1.8", "v2.8.1", "v1.8.3", "v0.3.1", "heapster-amd64:v1.4.2"),
            ("1.9", "v2.8.1", "v1.8.3", "v0.4.1", "heapster-amd64:v1.5.1"),
            ("1.10", "v2.8.1", "v1.8.3", "v0.5.1", "heapster-amd64:v1.5.1"),
            ("1.11", "v2.8.1", "v1.8.3", "v0.5.1", "heapster-amd64:v1.5.3"),
        ];

        let images = releases
            .into_iter()
            .map(|(release, tiller, dashboard, metrics, heapster)| {
                let components = [
                    (PAUSE_IMAGE, "pause-amd64:3.1".to_string()),
                    (NODE_STATUS_FREQUENCY, "10s".to_string()),
                    ("tiller", format!("tiller:{tiller}")),
                    ("dashboard", format!("kubernetes-dashboard-amd64:{dashboard}")),
                    ("metrics-server", format!("metrics-server-amd64:{metrics}")),
                    ("heapster", heapster.to_string()),
                    ("rescheduler", "rescheduler:v0.3.1".to_string()),
                    ("cluster-autoscaler", "cluster-autoscaler:v1.2.2".to_string()),
                    ("ip-masq-agent", "ip-masq-agent-amd64:v2.0.0".to_string()),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
                (release.to_string(), components)
            })
            .collect();

        Self(images)
    }

    /// True when the catalog holds no versions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Images for a version, matched exactly first and then by `major.minor`
    pub fn images_for(&self, version: &str) -> Option<&BTreeMap<String, String>> {
        if let Some(images) = self.0.get(version) {
            return Some(images);
        }
        let release = major_minor(version)?;
        self.0.get(release.as_str())
    }

    /// Image of one component for a version
    pub fn image(&self, version: &str, component: &str) -> Option<&str> {
        self.images_for(version)
            .and_then(|images| images.get(component))
            .map(String::as_str)
    }
}

/// Extract `major.minor` from a version string such as "1.9.6" or "v1.10.0-rc.1"
fn major_minor(version: &str) -> Option<String> {
    let version = version.trim_start_matches('v');
    let mut parts = version.split('.');
    let major = parts.next().filter(|p| !p.is_empty())?;
    let minor = parts.next().filter(|p| !p.is_empty())?;
    Some(format!("{major}.{minor}"))
}

/// Configuration injected into the resolvers
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Version -> component -> image table
    #[serde(default)]
    pub component_images: ImageCatalog,
    /// Registry prefix used when a cluster definition doesn't set one
    #[serde(default = "default_image_base")]
    pub kubernetes_image_base: String,
    /// Cluster DNS domain
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,
}

fn default_image_base() -> String {
    "k8s.gcr.io/".to_string()
}

fn default_cluster_domain() -> String {
    DEFAULT_CLUSTER_DOMAIN.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            component_images: ImageCatalog::builtin(),
            kubernetes_image_base: default_image_base(),
            cluster_domain: default_cluster_domain(),
        }
    }
}

impl EngineConfig {
    /// Load configuration following the resolution chain
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match config_path(explicit) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("no engine configuration file, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a file
    ///
    /// An empty image table falls back to the built-in catalog.
    pub fn from_file(path: &Path) -> Result<Self> {
        let path_display = path.display().to_string();
        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::config(&path_display, format!("failed to read: {}", e)))?;
        let mut config: EngineConfig = serde_yaml::from_str(&data)
            .map_err(|e| Error::config(&path_display, format!("failed to parse: {}", e)))?;
        if config.component_images.is_empty() {
            config.component_images = ImageCatalog::builtin();
        }
        debug!(path = %path_display, "loaded engine configuration");
        Ok(config)
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
