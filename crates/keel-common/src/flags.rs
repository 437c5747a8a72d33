//! Component flag maps
//!
//! A [`FlagMap`] maps a command-line flag (including its leading dashes) to its
//! value. Maps are ordered so rendering is deterministic.

use std::collections::BTreeMap;

/// Flag name to value, sorted by flag name
pub type FlagMap = BTreeMap<String, String>;

/// Flag carrying comma-separated `key=value` feature gates
pub const FEATURE_GATES_FLAG: &str = "--feature-gates";

/// Render flags as space-separated `key=value` tokens, sorted by key
pub fn render_flags(flags: &FlagMap) -> String {
    flags
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a flag map from `(flag, value)` pairs
pub fn flag_map<K, V, I>(pairs: I) -> FlagMap
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Parse a comma-separated `key=value` list such as a feature-gate string
///
/// Entries without `=` and empty entries are ignored.
pub fn parse_key_value_list(value: &str) -> BTreeMap<String, String> {
    value
        .split(',')
        .filter_map(|entry| {
            let (key, val) = entry.trim().split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), val.trim().to_string()))
        })
        .collect()
}

/// Join a map back into a sorted, comma-separated `key=value` list
pub fn join_key_value_list(values: &BTreeMap<String, String>) -> String {
    values
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Add feature gates to the `--feature-gates` flag of a map
///
/// Gates already present in the map keep their value.
pub fn add_feature_gates(flags: &mut FlagMap, gates: &str) {
    let additions = parse_key_value_list(gates);
    if additions.is_empty() {
        return;
    }
    let mut merged = flags
        .get(FEATURE_GATES_FLAG)
        .map(|existing| parse_key_value_list(existing))
        .unwrap_or_default();
    for (gate, value) in additions {
        merged.entry(gate).or_insert(value);
    }
    flags.insert(FEATURE_GATES_FLAG.to_string(), join_key_value_list(&merged));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_sorts_by_key() {
        let flags = flag_map([("--v", "2"), ("--address", "0.0.0.0")]);
        assert_eq!(render_flags(&flags), "--address=0.0.0.0 --v=2");
    }

    #[test]
    fn render_empty_map_is_empty_string() {
        assert_eq!(render_flags(&FlagMap::new()), "");
    }

    #[test]
    fn key_value_list_skips_garbage() {
        let parsed = parse_key_value_list("b=2, a=1,,novalue");
        assert_eq!(parsed.len(), 2);
        assert_eq!(join_key_value_list(&parsed), "a=1,b=2");
    }

    #[test]
    fn add_feature_gates_keeps_existing_values() {
        let mut flags = flag_map([(FEATURE_GATES_FLAG, "Accelerators=false,PodPriority=true")]);
        add_feature_gates(&mut flags, "Accelerators=true,ServiceNodeExclusion=true");
        assert_eq!(
            flags[FEATURE_GATES_FLAG],
            "Accelerators=false,PodPriority=true,ServiceNodeExclusion=true"
        );
    }

    #[test]
    fn add_feature_gates_creates_flag() {
        let mut flags = FlagMap::new();
        add_feature_gates(&mut flags, "ServiceNodeExclusion=true");
        assert_eq!(flags[FEATURE_GATES_FLAG], "ServiceNodeExclusion=true");
    }
}
