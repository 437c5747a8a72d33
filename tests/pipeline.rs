//! End-to-end pipeline tests
//!
//! Drives a cluster definition through the whole engine: version and flag
//! resolution, certificate generation, and template normalization for a
//! later scale-up. No network or cluster is needed.

use keel_common::{ClusterDefinition, EngineConfig};
use keel_config::{resolve_cluster, ResolveOptions};
use keel_graph::{
    dangling_dependencies, normalize_for_availability_set_scale_up, DeploymentGraph,
    NSG_RESOURCE_TYPE,
};
use keel_pki::{generate_pki, CertificateAuthority, PkiRequest};
use serde_json::json;

const DEFINITION: &str = r#"{
    "location": "eastus",
    "orchestratorProfile": {
        "orchestratorType": "Kubernetes",
        "orchestratorRelease": "1.10",
        "kubernetesConfig": {
            "enableRbac": true,
            "schedulerConfig": {"--kubeconfig": "user-override", "--v": "4"}
        }
    },
    "masterProfile": {"count": 1, "dnsPrefix": "pipeline", "vmSize": "Standard_D2_v2"},
    "agentPoolProfiles": [
        {"name": "agentpool1", "count": 3, "vmSize": "Standard_D2_v2", "availabilityProfile": "AvailabilitySet"}
    ]
}"#;

fn template() -> serde_json::Value {
    json!({
        "contentVersion": "1.0.0.0",
        "resources": [
            {"type": "Microsoft.Network/networkSecurityGroups", "name": "[variables('nsgName')]"},
            {
                "type": "Microsoft.Network/virtualNetworks",
                "name": "[variables('virtualNetworkName')]",
                "dependsOn": ["[concat('Microsoft.Network/networkSecurityGroups/', variables('nsgName'))]"]
            },
            {
                "type": "Microsoft.Compute/virtualMachines",
                "name": "[concat(variables('masterVMNamePrefix'), copyIndex(variables('masterOffset')))]",
                "dependsOn": ["[variables('vnetID')]", "[variables('nsgID')]"],
                "properties": {
                    "hardwareProfile": {"vmSize": "[variables('masterVMSize')]"},
                    "osProfile": {"customData": "[base64('init')]", "adminUsername": "azureuser"},
                    "storageProfile": {"imageReference": {"sku": "16.04-LTS"}}
                }
            }
        ]
    })
}

/// Story: a new cluster is resolved, secured, and later scaled up
#[tokio::test]
async fn story_cluster_from_definition_to_scale_up() {
    let definition = ClusterDefinition::from_json(DEFINITION).expect("definition should parse");
    let engine = EngineConfig::default();

    // Chapter 1: configuration resolution
    // -----------------------------------
    let resolved = resolve_cluster(&definition, &engine, ResolveOptions::default())
        .expect("resolution should succeed");
    assert!(resolved.orchestrator_version.starts_with("1.10."));
    assert_eq!(
        resolved.scheduler.get("--kubeconfig").map(String::as_str),
        Some("/var/lib/kubelet/kubeconfig")
    );
    assert_eq!(resolved.scheduler.get("--v").map(String::as_str), Some("4"));
    assert_eq!(
        resolved
            .controller_manager
            .get("--use-service-account-credentials")
            .map(String::as_str),
        Some("true")
    );
    assert!(resolved.agent_kubelets.contains_key("agentpool1"));

    // Chapter 2: certificates for the master
    // --------------------------------------
    let request = PkiRequest::for_cluster(&definition, &engine.cluster_domain)
        .expect("PKI request should derive from the definition");
    assert!(request
        .api_server_dns_names()
        .contains(&"pipeline.eastus.cloudapp.azure.com".to_string()));

    let bundle = generate_pki(request).await.expect("PKI generation should succeed");
    assert_eq!(bundle.etcd_peers.len(), 1);

    let ca = CertificateAuthority::from_pem(&bundle.ca.certificate_pem, &bundle.ca.private_key_pem)
        .expect("bundle CA should load");
    for (role, pair) in bundle.leaves() {
        ca.verify(&pair.certificate_pem)
            .unwrap_or_else(|e| panic!("{} should chain to the CA: {}", role, e));
    }

    // Chapter 3: the rendered template is prepared for adding agents
    // ---------------------------------------------------------------
    let mut graph = DeploymentGraph::from_value(template()).expect("template should load");
    normalize_for_availability_set_scale_up(&mut graph).expect("scale-up should succeed");

    assert!(graph.indexes_of_type(NSG_RESOURCE_TYPE).is_empty());
    assert!(dangling_dependencies(&graph).is_empty());

    let master = &graph.resources()[1];
    assert_eq!(master["dependsOn"], json!(["[variables('vnetID')]"]));
    assert!(master["properties"]["hardwareProfile"].get("vmSize").is_none());
    assert_eq!(master["properties"]["osProfile"]["adminUsername"], "azureuser");
}

/// Story: a definition that asks for an unknown version stops before any output
#[test]
fn story_unsupported_version_is_reported_with_the_version() {
    let definition = ClusterDefinition::from_json(
        r#"{
            "orchestratorProfile": {"orchestratorType": "Kubernetes", "orchestratorVersion": "1.99.0"},
            "masterProfile": {"count": 1}
        }"#,
    )
    .expect("definition should parse");

    let err = resolve_cluster(&definition, &EngineConfig::default(), ResolveOptions::default())
        .expect_err("1.99.0 is not supported");
    assert!(err.to_string().contains("1.99.0"));
}
