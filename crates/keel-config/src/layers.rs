//! Layered flag resolution
//!
//! A component's flags come from several sources with a fixed priority. Layers
//! are merged from lowest to highest priority, so a key set by a higher layer
//! always replaces the value of a lower one. Static overrides sit on top and
//! can never be displaced by user input.

use std::collections::BTreeMap;

use keel_common::FlagMap;

/// Source of a flag layer, ordered by ascending priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    /// Version- and feature-gated defaults
    Default,
    /// Flags supplied in the cluster definition
    User,
    /// Values derived from cluster features that replace user input
    Computed,
    /// Security- and correctness-critical values
    Static,
}

/// Ordered set of flag layers for one component
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayeredFlags {
    layers: BTreeMap<LayerKind, FlagMap>,
}

impl LayeredFlags {
    /// Empty layer set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add flags to a layer, replacing keys already in that layer
    pub fn with_layer(mut self, kind: LayerKind, flags: FlagMap) -> Self {
        self.layers.entry(kind).or_default().extend(flags);
        self
    }

    /// Add a layer only when flags are present
    pub fn with_optional_layer(self, kind: LayerKind, flags: Option<&FlagMap>) -> Self {
        match flags {
            Some(flags) => self.with_layer(kind, flags.clone()),
            None => self,
        }
    }

    /// Flags of one layer
    pub fn layer(&self, kind: LayerKind) -> Option<&FlagMap> {
        self.layers.get(&kind)
    }

    /// Layer that supplies the resolved value of `key`
    pub fn source_of(&self, key: &str) -> Option<LayerKind> {
        self.layers
            .iter()
            .rev()
            .find(|(_, flags)| flags.contains_key(key))
            .map(|(kind, _)| *kind)
    }

    /// Merge all layers, highest priority winning
    pub fn resolve(&self) -> FlagMap {
        let mut resolved = FlagMap::new();
        for flags in self.layers.values() {
            for (key, value) in flags {
                resolved.insert(key.clone(), value.clone());
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::flags::flag_map;

    #[test]
    fn static_layer_beats_user_regardless_of_insert_order() {
        let layered = LayeredFlags::new()
            .with_layer(LayerKind::Static, flag_map([("--kubeconfig", "/static")]))
            .with_layer(LayerKind::User, flag_map([("--kubeconfig", "/user")]))
            .with_layer(LayerKind::Default, flag_map([("--kubeconfig", "/default")]));

        let resolved = layered.resolve();
        assert_eq!(resolved["--kubeconfig"], "/static");
        assert_eq!(layered.source_of("--kubeconfig"), Some(LayerKind::Static));
    }

    #[test]
    fn user_values_survive_defaults() {
        let layered = LayeredFlags::new()
            .with_layer(LayerKind::Default, flag_map([("--v", "2"), ("--profiling", "false")]))
            .with_layer(LayerKind::User, flag_map([("--v", "5")]));

        let resolved = layered.resolve();
        assert_eq!(resolved["--v"], "5");
        assert_eq!(resolved["--profiling"], "false");
        assert_eq!(layered.source_of("--profiling"), Some(LayerKind::Default));
    }

    #[test]
    fn absent_user_layer_adopts_defaults_wholesale() {
        let defaults = flag_map([("--a", "1"), ("--b", "2")]);
        let layered = LayeredFlags::new()
            .with_layer(LayerKind::Default, defaults.clone())
            .with_optional_layer(LayerKind::User, None);
        assert_eq!(layered.resolve(), defaults);
        assert!(layered.layer(LayerKind::User).is_none());
    }

    #[test]
    fn unknown_key_has_no_source() {
        assert_eq!(LayeredFlags::new().source_of("--missing"), None);
    }
}
