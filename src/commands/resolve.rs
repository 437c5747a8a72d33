//! Resolve command

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use keel_common::EngineConfig;
use keel_config::{resolve_cluster, ResolveOptions, ResolvedCluster};
use serde::Serialize;
use serde_json::Value;

use super::read_definition;
use crate::Result;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Cluster definition JSON file
    pub definition: PathBuf,

    /// Resolve as an upgrade, which also accepts upgrade-only versions
    #[arg(long)]
    pub upgrade: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveOutput<'a> {
    cluster: &'a ResolvedCluster,
    rendered_flags: BTreeMap<String, String>,
}

pub fn run(args: ResolveArgs, engine: &EngineConfig) -> Result<Value> {
    let definition = read_definition(&args.definition)?;
    let resolved = resolve_cluster(
        &definition,
        engine,
        ResolveOptions {
            is_update: args.upgrade,
        },
    )?;

    Ok(serde_json::to_value(ResolveOutput {
        cluster: &resolved,
        rendered_flags: resolved.rendered_flags(),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{write_temp, DEFINITION};

    #[test]
    fn resolves_definition_file() {
        let file = write_temp(DEFINITION);
        let output = run(
            ResolveArgs {
                definition: file.path().to_path_buf(),
                upgrade: false,
            },
            &EngineConfig::default(),
        )
        .expect("resolution should succeed");

        let version = output["cluster"]["orchestratorVersion"]
            .as_str()
            .expect("version string");
        assert!(version.starts_with("1.9."));

        let scheduler = output["renderedFlags"]["kube-scheduler"]
            .as_str()
            .expect("rendered scheduler flags");
        assert!(scheduler.contains("--kubeconfig=/var/lib/kubelet/kubeconfig"));
    }

    #[test]
    fn non_kubernetes_definition_is_rejected() {
        let file = write_temp(
            r#"{"orchestratorProfile": {"orchestratorType": "DCOS"}, "masterProfile": {"count": 1}}"#,
        );
        let err = run(
            ResolveArgs {
                definition: file.path().to_path_buf(),
                upgrade: false,
            },
            &EngineConfig::default(),
        )
        .expect_err("DCOS has no component configuration");
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
