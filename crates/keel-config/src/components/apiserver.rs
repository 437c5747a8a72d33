//! kube-apiserver flags

use keel_common::flags::flag_map;
use keel_common::{FlagMap, OsType};

use super::{in_tree_cloud_provider, ComponentRules, CA_CERT_PATH};
use crate::ResolveContext;

const KUBELET_CLIENT_CERT: &str = "--kubelet-client-certificate";
const KUBELET_CLIENT_KEY: &str = "--kubelet-client-key";
const LEGACY_ADMISSION_CONTROL: &str = "--admission-control";
const ADMISSION_PLUGINS: &str = "--enable-admission-plugins";

const ADMISSION_PLUGINS_1_9: &str = "NamespaceLifecycle,LimitRanger,ServiceAccount,DefaultStorageClass,DefaultTolerationSeconds,MutatingAdmissionWebhook,ValidatingAdmissionWebhook,ResourceQuota,AlwaysPullImages,ExtendedResourceToleration";
const ADMISSION_PLUGINS_LEGACY: &str =
    "NamespaceLifecycle,LimitRanger,ServiceAccount,DefaultStorageClass,ResourceQuota,AlwaysPullImages";

/// kube-apiserver rules
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiServerRules;

impl ComponentRules for ApiServerRules {
    fn defaults(&self, ctx: &ResolveContext<'_>) -> FlagMap {
        let k8s = ctx.kubernetes();
        let mut flags = flag_map([
            ("--audit-log-maxage", "30"),
            ("--audit-log-maxbackup", "10"),
            ("--audit-log-maxsize", "100"),
        ]);

        if k8s.enable_aggregated_apis || ctx.at_least("1.9.0") {
            flags.extend(flag_map([
                (
                    "--requestheader-client-ca-file",
                    "/etc/kubernetes/certs/proxy-ca.crt",
                ),
                ("--proxy-client-cert-file", "/etc/kubernetes/certs/proxy.crt"),
                ("--proxy-client-key-file", "/etc/kubernetes/certs/proxy.key"),
                ("--requestheader-allowed-names", ""),
                ("--requestheader-extra-headers-prefix", "X-Remote-Extra-"),
                ("--requestheader-group-headers", "X-Remote-Group"),
                ("--requestheader-username-headers", "X-Remote-User"),
            ]));
        }

        if let Some(aad) = &ctx.definition.aad_profile {
            let issuer = format!(
                "https://{}/{}/",
                ctx.definition.cloud().sts_host(),
                aad.tenant_id
            );
            flags.extend(flag_map([
                ("--oidc-username-claim", "oid".to_string()),
                ("--oidc-groups-claim", "groups".to_string()),
                ("--oidc-client-id", format!("spn:{}", aad.server_app_id)),
                ("--oidc-issuer-url", issuer),
            ]));
        }

        if ctx.at_least("1.8.0") {
            flags.insert(
                "--audit-policy-file".to_string(),
                "/etc/kubernetes/addons/audit-policy.yaml".to_string(),
            );
        }

        if k8s.rbac_enabled() {
            let mode = if ctx.at_least("1.7.0") { "Node,RBAC" } else { "RBAC" };
            flags.insert("--authorization-mode".to_string(), mode.to_string());
        }

        let admission_key = if ctx.at_least("1.10.0") {
            ADMISSION_PLUGINS
        } else {
            LEGACY_ADMISSION_CONTROL
        };
        let mut plugins = if ctx.at_least("1.9.0") {
            ADMISSION_PLUGINS_1_9.to_string()
        } else {
            ADMISSION_PLUGINS_LEGACY.to_string()
        };
        if k8s.pod_security_policy_enabled() {
            plugins.push_str(",PodSecurityPolicy");
        }
        flags.insert(admission_key.to_string(), plugins);

        flags
    }

    fn static_flags(&self, ctx: &ResolveContext<'_>, _os: OsType) -> FlagMap {
        let k8s = ctx.kubernetes();
        let mut flags = flag_map([
            ("--bind-address", "0.0.0.0".to_string()),
            ("--advertise-address", "<kubernetesAPIServerIP>".to_string()),
            ("--allow-privileged", "true".to_string()),
            ("--anonymous-auth", "false".to_string()),
            (
                "--audit-log-path",
                "/var/log/kubeaudit/audit.log".to_string(),
            ),
            ("--insecure-port", "8080".to_string()),
            ("--secure-port", "443".to_string()),
            ("--service-account-lookup", "true".to_string()),
            ("--etcd-cafile", CA_CERT_PATH.to_string()),
            (
                "--etcd-certfile",
                "/etc/kubernetes/certs/etcdclient.crt".to_string(),
            ),
            (
                "--etcd-keyfile",
                "/etc/kubernetes/certs/etcdclient.key".to_string(),
            ),
            ("--etcd-servers", "https://127.0.0.1:2379".to_string()),
            (
                "--tls-cert-file",
                "/etc/kubernetes/certs/apiserver.crt".to_string(),
            ),
            (
                "--tls-private-key-file",
                "/etc/kubernetes/certs/apiserver.key".to_string(),
            ),
            ("--client-ca-file", CA_CERT_PATH.to_string()),
            ("--profiling", "false".to_string()),
            ("--repair-malformed-updates", "false".to_string()),
            (
                "--service-account-key-file",
                "/etc/kubernetes/certs/apiserver.key".to_string(),
            ),
            (
                KUBELET_CLIENT_CERT,
                "/etc/kubernetes/certs/client.crt".to_string(),
            ),
            (KUBELET_CLIENT_KEY, "/etc/kubernetes/certs/client.key".to_string()),
            ("--service-cluster-ip-range", k8s.service_cidr.clone()),
            ("--storage-backend", storage_backend(&k8s.etcd_version)),
            ("--v", "4".to_string()),
        ]);

        if k8s.encryption_at_rest_enabled() {
            flags.insert(
                "--experimental-encryption-provider-config".to_string(),
                "/etc/kubernetes/encryption-config.yaml".to_string(),
            );
        }

        in_tree_cloud_provider(ctx, &mut flags);

        flags
    }

    fn prune(&self, ctx: &ResolveContext<'_>, flags: &mut FlagMap) {
        if !ctx.kubernetes().secure_kubelet_enabled() {
            flags.remove(KUBELET_CLIENT_CERT);
            flags.remove(KUBELET_CLIENT_KEY);
        }
        if ctx.at_least("1.10.0") {
            flags.remove(LEGACY_ADMISSION_CONTROL);
        }
        if ctx.at_least("1.14.0") {
            flags.remove("--repair-malformed-updates");
        }
    }
}

/// `etcd<major>` storage backend for an etcd version such as "3.2.23"
fn storage_backend(etcd_version: &str) -> String {
    let major = etcd_version
        .split('.')
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("3");
    format!("etcd{major}")
}
