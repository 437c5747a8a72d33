//! Component and addon configuration resolution
//!
//! Turns a cluster definition into complete flag sets for the control plane
//! and kubelets plus a finalized addon list. Lookup tables (component images,
//! addon defaults) are immutable and injected through [`ResolveContext`].

#![deny(missing_docs)]

pub mod addons;
pub mod cluster;
pub mod components;
pub mod context;
pub mod defaults;
pub mod error;
pub mod layers;

pub use addons::{
    is_addon_enabled, resolve_addons, resolve_and_synthesize, synthesize_addon, AddonCatalog,
};
pub use cluster::{resolve_cluster, ResolveOptions, ResolvedCluster};
pub use components::{
    effective_static_flags, resolve_component, resolve_role_kubelet, Component, ComponentRules,
    KubeletRole,
};
pub use context::ResolveContext;
pub use defaults::apply_cluster_defaults;
pub use error::{ConfigError, Result};
pub use layers::{LayerKind, LayeredFlags};
