//! The deployment graph document and dependency edges
//!
//! A graph is a rendered template: a JSON object whose `resources` array
//! holds the nodes and whose per-resource `dependsOn` arrays hold the edges.
//! Every key the transforms do not touch is carried through unchanged.
//!
//! Edges are template expressions rather than plain ids, so an edge is taken
//! to reference a resource when it contains that resource's name expression,
//! or the well-known id variable of its type (for example `nsgID`).

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{GraphError, Result};
use crate::{
    DEPENDS_ON, NAME, NSG_RESOURCE_TYPE, RESOURCES, ROUTE_TABLE_RESOURCE_TYPE, TYPE,
    VNET_RESOURCE_TYPE,
};

/// Id variables that stand in for a resource of a given type
const ID_ALIASES: &[(&str, &str)] = &[
    ("nsgID", NSG_RESOURCE_TYPE),
    ("routeTableID", ROUTE_TABLE_RESOURCE_TYPE),
    ("vnetID", VNET_RESOURCE_TYPE),
];

/// A parsed deployment template
#[derive(Clone, Debug, PartialEq)]
pub struct DeploymentGraph {
    document: Map<String, Value>,
    resources: Vec<Value>,
}

impl DeploymentGraph {
    /// Parse a template from JSON text
    pub fn from_json(data: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(data)?;
        Self::from_value(value)
    }

    /// Wrap an already parsed template
    pub fn from_value(value: Value) -> Result<Self> {
        let mut document = match value {
            Value::Object(map) => map,
            other => {
                return Err(GraphError::malformed(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )))
            }
        };

        let resources = match document.remove(RESOURCES) {
            Some(Value::Array(resources)) => resources,
            Some(other) => {
                return Err(GraphError::malformed(format!(
                    "'{}' must be an array, found {}",
                    RESOURCES,
                    json_kind(&other)
                )))
            }
            None => {
                return Err(GraphError::malformed(format!(
                    "template has no '{}' array",
                    RESOURCES
                )))
            }
        };

        Ok(Self {
            document,
            resources,
        })
    }

    /// The template as a JSON value
    pub fn to_value(&self) -> Value {
        let mut document = self.document.clone();
        document.insert(RESOURCES.to_string(), Value::Array(self.resources.clone()));
        Value::Object(document)
    }

    /// The template as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// Resource nodes in template order
    pub fn resources(&self) -> &[Value] {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut Vec<Value> {
        &mut self.resources
    }

    /// Number of resource nodes
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// True when the template has no resources
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Indexes of resources with the given type
    pub fn indexes_of_type(&self, wanted: &str) -> Vec<usize> {
        self.resources
            .iter()
            .enumerate()
            .filter(|(_, r)| resource_type(r) == Some(wanted))
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove every `dependsOn` entry matching `remove`, keeping the order of the rest
    pub(crate) fn prune_dependencies<F>(&mut self, remove: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut pruned = 0;
        for (index, resource) in self.resources.iter_mut().enumerate() {
            let Some(deps) = resource.get_mut(DEPENDS_ON) else {
                continue;
            };
            let Some(deps) = deps.as_array_mut() else {
                warn!(index, "resource has a non-array dependsOn, skipping");
                continue;
            };
            let before = deps.len();
            deps.retain(|dep| dep.as_str().map(|d| !remove(d)).unwrap_or(true));
            pruned += before - deps.len();
        }
        pruned
    }
}

/// An edge whose target is not in the graph
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DanglingDependency {
    /// Name of the resource holding the edge
    pub resource: String,
    /// The unresolved `dependsOn` entry
    pub dependency: String,
}

/// Edges that reference no resource present in the graph
pub fn dangling_dependencies(graph: &DeploymentGraph) -> Vec<DanglingDependency> {
    let mut dangling = Vec::new();
    for resource in graph.resources() {
        let Some(deps) = resource.get(DEPENDS_ON).and_then(Value::as_array) else {
            continue;
        };
        for dep in deps.iter().filter_map(Value::as_str) {
            if !graph.resources().iter().any(|target| references(dep, target)) {
                dangling.push(DanglingDependency {
                    resource: resource_name(resource).unwrap_or_default().to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
    }
    dangling
}

/// Whether a `dependsOn` entry points at `target`
pub fn references(dependency: &str, target: &Value) -> bool {
    if let Some(name) = resource_name(target) {
        let expression = name_expression(name);
        if !expression.is_empty() && dependency.contains(expression) {
            return true;
        }
    }
    match resource_type(target) {
        Some(target_type) => ID_ALIASES
            .iter()
            .any(|(alias, alias_type)| *alias_type == target_type && dependency.contains(alias)),
        None => false,
    }
}

/// Core of a name expression: `[concat(a, b)]` becomes `a, b`, `[x]` becomes `x`
fn name_expression(name: &str) -> &str {
    let inner = name
        .strip_prefix('[')
        .and_then(|n| n.strip_suffix(']'))
        .unwrap_or(name);
    inner
        .strip_prefix("concat(")
        .and_then(|n| n.strip_suffix(')'))
        .unwrap_or(inner)
}

/// `type` of a resource node
pub fn resource_type(resource: &Value) -> Option<&str> {
    resource.get(TYPE).and_then(Value::as_str)
}

/// `name` of a resource node
pub fn resource_name(resource: &Value) -> Option<&str> {
    resource.get(NAME).and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn unknown_keys_survive_round_trip() {
        let doc = json!({
            "$schema": "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#",
            "contentVersion": "1.0.0.0",
            "parameters": {"location": {"type": "string"}},
            "resources": [{"type": "x", "name": "y", "apiVersion": "2018-06-01", "custom": [1, 2]}]
        });
        let graph = DeploymentGraph::from_value(doc.clone()).expect("graph should load");
        assert_eq!(graph.to_value(), doc);

        let reparsed = DeploymentGraph::from_json(&graph.to_json().expect("graph should serialize"))
            .expect("serialized graph should parse");
        assert_eq!(reparsed, graph);
    }

    #[rstest]
    #[case(json!([1, 2]))]
    #[case(json!({"parameters": {}}))]
    #[case(json!({"resources": {"not": "an array"}}))]
    fn top_level_malformation_is_rejected(#[case] doc: Value) {
        let err = DeploymentGraph::from_value(doc).expect_err("malformed document should fail");
        assert!(matches!(err, GraphError::Malformed { .. }));
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let err = DeploymentGraph::from_json("{ nope").expect_err("bad JSON should fail");
        assert!(matches!(err, GraphError::Serialization { .. }));
    }

    #[rstest]
    #[case(
        "[concat('Microsoft.Compute/virtualMachines/', variables('masterVMNamePrefix'), copyIndex())]",
        json!({"type": "Microsoft.Compute/virtualMachines", "name": "[concat(variables('masterVMNamePrefix'), copyIndex())]"}),
        true
    )]
    #[case(
        "[variables('nsgID')]",
        json!({"type": "Microsoft.Network/networkSecurityGroups", "name": "[variables('nsgName')]"}),
        true
    )]
    #[case(
        "[concat('Microsoft.Network/networkSecurityGroups/', variables('nsgName'))]",
        json!({"type": "Microsoft.Network/networkSecurityGroups", "name": "[variables('nsgName')]"}),
        true
    )]
    #[case(
        "[variables('vnetID')]",
        json!({"type": "Microsoft.Network/networkSecurityGroups", "name": "[variables('nsgName')]"}),
        false
    )]
    #[case("anything", json!({"type": "x", "name": ""}), false)]
    fn dependency_reference_matching(
        #[case] dependency: &str,
        #[case] target: Value,
        #[case] expected: bool,
    ) {
        assert_eq!(references(dependency, &target), expected);
    }

    #[test]
    fn dangling_edges_are_reported() {
        let graph = DeploymentGraph::from_value(json!({
            "resources": [
                {"type": "Microsoft.Network/networkSecurityGroups", "name": "[variables('nsgName')]"},
                {
                    "type": "Microsoft.Network/virtualNetworks",
                    "name": "[variables('vnetName')]",
                    "dependsOn": ["[variables('nsgID')]", "[variables('routeTableID')]"]
                }
            ]
        }))
        .expect("graph should load");

        assert_eq!(
            dangling_dependencies(&graph),
            vec![DanglingDependency {
                resource: "[variables('vnetName')]".to_string(),
                dependency: "[variables('routeTableID')]".to_string(),
            }]
        );
    }

    #[test]
    fn prune_keeps_order_and_skips_malformed_edges() {
        let mut graph = DeploymentGraph::from_value(json!({
            "resources": [
                {"name": "a", "dependsOn": ["one", "drop-me", "two", 3]},
                {"name": "b", "dependsOn": "not-an-array"}
            ]
        }))
        .expect("graph should load");

        let pruned = graph.prune_dependencies(|dep| dep.starts_with("drop"));
        assert_eq!(pruned, 1);
        assert_eq!(graph.resources()[0]["dependsOn"], json!(["one", "two", 3]));
        assert_eq!(graph.resources()[1]["dependsOn"], json!("not-an-array"));
    }
}
