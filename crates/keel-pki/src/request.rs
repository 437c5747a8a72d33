//! PKI generation requests and SAN derivation

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};

use keel_common::{regional_fqdns, CertificateProfile, ClusterDefinition, DEFAULT_CLUSTER_DOMAIN};
use zeroize::Zeroizing;

use crate::error::{PkiError, Result};
use crate::generate::LeafRole;
use crate::PkiKeyCertPair;

/// Static IP of the first master when the definition leaves it empty
pub const DEFAULT_FIRST_MASTER_IP: &str = "10.240.255.5";

/// Service CIDR when the definition leaves it empty
pub const DEFAULT_SERVICE_CIDR: &str = "10.0.0.0/16";

/// Offset of the internal load balancer IP from the first master IP
pub const INTERNAL_LB_IP_OFFSET: u32 = 10;

/// Where the CA comes from
#[derive(Clone, Default)]
pub enum CaSource {
    /// Generate a new self-signed CA
    #[default]
    Generate,
    /// Use a caller-supplied CA pair
    Supplied {
        /// PEM certificate
        certificate_pem: String,
        /// PEM private key
        private_key_pem: Zeroizing<String>,
    },
}

impl std::fmt::Debug for CaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generate => f.write_str("Generate"),
            Self::Supplied { .. } => f.write_str("Supplied"),
        }
    }
}

/// Inputs to one PKI generation run
#[derive(Clone, Debug)]
pub struct PkiRequest {
    /// DNS names for the API server certificate beyond the in-cluster names
    pub extra_fqdns: Vec<String>,
    /// IP addresses for the API server and etcd certificates
    pub extra_ips: Vec<IpAddr>,
    /// Cluster DNS domain
    pub cluster_domain: String,
    /// Number of masters, one etcd peer certificate each
    pub master_count: u32,
    /// CA to sign with
    pub ca: CaSource,
    /// Leaf pairs to reuse instead of signing; only honoured with a supplied CA
    pub supplied_leaves: BTreeMap<LeafRole, PkiKeyCertPair>,
}

impl PkiRequest {
    /// Request with no extra SANs and a generated CA
    pub fn new(master_count: u32) -> Self {
        Self {
            extra_fqdns: Vec::new(),
            extra_ips: Vec::new(),
            cluster_domain: DEFAULT_CLUSTER_DOMAIN.to_string(),
            master_count,
            ca: CaSource::Generate,
            supplied_leaves: BTreeMap::new(),
        }
    }

    /// Derive the request from a cluster definition
    ///
    /// FQDNs are the public name of the master DNS prefix in every known
    /// region, each with its own cloud's suffix, plus any master subject alt
    /// names. IPs are the first master IP, the internal
    /// load balancer IP, one IP per additional master, and the first IP of the
    /// service CIDR.
    pub fn for_cluster(definition: &ClusterDefinition, cluster_domain: &str) -> Result<Self> {
        let master = definition.master_profile.as_ref();
        let master_count = definition.master_count();

        let mut fqdns = Vec::new();
        if let Some(master) = master {
            if !master.dns_prefix.is_empty() {
                fqdns.extend(regional_fqdns(&master.dns_prefix, &definition.location));
            }
            fqdns.extend(master.subject_alt_names.iter().cloned());
        }

        let first_ip = master
            .map(|m| m.first_consecutive_static_ip.as_str())
            .filter(|ip| !ip.is_empty())
            .unwrap_or(DEFAULT_FIRST_MASTER_IP);
        let first_ip = parse_ipv4(first_ip, "masterProfile.firstConsecutiveStaticIP")?;

        let mut ips = vec![
            IpAddr::V4(first_ip),
            IpAddr::V4(offset_ip(first_ip, INTERNAL_LB_IP_OFFSET)),
        ];
        for i in 1..master_count {
            ips.push(IpAddr::V4(offset_ip(first_ip, i)));
        }

        let service_cidr = &definition
            .orchestrator_profile
            .kubernetes_config
            .service_cidr;
        let service_cidr = if service_cidr.is_empty() {
            DEFAULT_SERVICE_CIDR
        } else {
            service_cidr.as_str()
        };
        ips.push(IpAddr::V4(first_service_ip(service_cidr)?));

        let (ca, supplied_leaves) = match &definition.certificate_profile {
            Some(profile) if profile.has_ca() => (
                CaSource::Supplied {
                    certificate_pem: profile.ca_certificate.clone(),
                    private_key_pem: Zeroizing::new(profile.ca_private_key.clone()),
                },
                supplied_leaves(profile, master_count),
            ),
            _ => (CaSource::Generate, BTreeMap::new()),
        };

        Ok(Self {
            extra_fqdns: fqdns,
            extra_ips: ips,
            cluster_domain: cluster_domain.to_string(),
            master_count,
            ca,
            supplied_leaves,
        })
    }

    /// DNS SANs of the API server certificate, deduplicated in first-seen order
    pub fn api_server_dns_names(&self) -> Vec<String> {
        let mut names = self.extra_fqdns.clone();
        names.extend(cluster_dns_names(&self.cluster_domain));
        dedup(names)
    }

    /// IP SANs of the API server certificate
    pub fn api_server_ips(&self) -> Vec<IpAddr> {
        dedup(self.extra_ips.clone())
    }

    /// IP SANs of the etcd certificates: the supplied IPs plus loopback
    pub fn etcd_ips(&self) -> Vec<IpAddr> {
        let mut ips = self.extra_ips.clone();
        ips.push(IpAddr::V4(Ipv4Addr::LOCALHOST));
        dedup(ips)
    }
}

/// Complete leaf groups of a certificate profile, keyed by role
///
/// The API server, client and kubeconfig pairs stand alone. etcd server,
/// client and peer pairs are taken together or not at all.
pub fn supplied_leaves(
    profile: &CertificateProfile,
    master_count: u32,
) -> BTreeMap<LeafRole, PkiKeyCertPair> {
    let pair = |cert: &str, key: &str| PkiKeyCertPair {
        certificate_pem: cert.to_string(),
        private_key_pem: Zeroizing::new(key.to_string()),
    };

    let mut leaves = BTreeMap::new();
    if profile.has_api_server() {
        leaves.insert(
            LeafRole::ApiServer,
            pair(&profile.api_server_certificate, &profile.api_server_private_key),
        );
    }
    if profile.has_client() {
        leaves.insert(
            LeafRole::Client,
            pair(&profile.client_certificate, &profile.client_private_key),
        );
    }
    if profile.has_kube_config() {
        leaves.insert(
            LeafRole::Kubeconfig,
            pair(&profile.kube_config_certificate, &profile.kube_config_private_key),
        );
    }
    if profile.has_etcd(master_count) {
        leaves.insert(
            LeafRole::EtcdServer,
            pair(&profile.etcd_server_certificate, &profile.etcd_server_private_key),
        );
        leaves.insert(
            LeafRole::EtcdClient,
            pair(&profile.etcd_client_certificate, &profile.etcd_client_private_key),
        );
        let peers = profile
            .etcd_peer_certificates
            .iter()
            .zip(&profile.etcd_peer_private_keys);
        for (index, (cert, key)) in (0..master_count).zip(peers) {
            leaves.insert(LeafRole::EtcdPeer(index), pair(cert, key));
        }
    }
    leaves
}

/// In-cluster names the API server certificate must always carry
pub fn cluster_dns_names(cluster_domain: &str) -> Vec<String> {
    vec![
        "kubernetes".to_string(),
        "kubernetes.default".to_string(),
        "kubernetes.default.svc".to_string(),
        format!("kubernetes.default.svc.{}", cluster_domain),
        "kubernetes.kube-system".to_string(),
        "kubernetes.kube-system.svc".to_string(),
        format!("kubernetes.kube-system.svc.{}", cluster_domain),
    ]
}

fn dedup<T: Ord + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn parse_ipv4(value: &str, field: &str) -> Result<Ipv4Addr> {
    value
        .parse()
        .map_err(|e| PkiError::ParseError(format!("{}: invalid IPv4 address '{}': {}", field, value, e)))
}

fn offset_ip(base: Ipv4Addr, offset: u32) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(base).wrapping_add(offset))
}

fn first_service_ip(cidr: &str) -> Result<Ipv4Addr> {
    let network = cidr.split('/').next().unwrap_or(cidr);
    let network = parse_ipv4(network, "kubernetesConfig.serviceCidr")?;
    Ok(offset_ip(network, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::{MasterProfile, AZURE_LOCATIONS};

    fn definition(master_count: u32) -> ClusterDefinition {
        let mut def = ClusterDefinition::default();
        def.location = "westus2".to_string();
        def.master_profile = Some(MasterProfile {
            count: master_count,
            dns_prefix: "mycluster".to_string(),
            ..Default::default()
        });
        def
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().expect("valid IP literal")
    }

    #[test]
    fn cluster_request_derives_regional_fqdns_and_master_ips() {
        let request = PkiRequest::for_cluster(&definition(3), "cluster.local")
            .expect("request derivation should succeed");

        assert_eq!(request.master_count, 3);
        assert_eq!(request.extra_fqdns.len(), AZURE_LOCATIONS.len());
        for location in AZURE_LOCATIONS {
            assert!(
                request
                    .extra_fqdns
                    .iter()
                    .any(|fqdn| fqdn.starts_with(&format!("mycluster.{}.", location))),
                "missing FQDN for {}",
                location
            );
        }
        // Reachable from a region other than its own
        assert!(request
            .api_server_dns_names()
            .contains(&"mycluster.eastus.cloudapp.azure.com".to_string()));
        assert!(request
            .extra_fqdns
            .contains(&"mycluster.westus2.cloudapp.azure.com".to_string()));
        assert_eq!(
            request.extra_ips,
            vec![
                ip("10.240.255.5"),
                ip("10.240.255.15"),
                ip("10.240.255.6"),
                ip("10.240.255.7"),
                ip("10.0.0.1"),
            ]
        );
        assert!(matches!(request.ca, CaSource::Generate));
    }

    #[test]
    fn each_region_uses_its_own_cloud_suffix() {
        let mut def = definition(1);
        def.location = "chinaeast2".to_string();
        if let Some(master) = def.master_profile.as_mut() {
            master.subject_alt_names = vec!["api.example.com".to_string()];
        }
        let request =
            PkiRequest::for_cluster(&def, "cluster.local").expect("request derivation should succeed");

        for expected in [
            "mycluster.chinaeast2.cloudapp.chinacloudapi.cn",
            "mycluster.chinanorth.cloudapp.chinacloudapi.cn",
            "mycluster.germanycentral.cloudapp.microsoftazure.de",
            "mycluster.usgovvirginia.cloudapp.usgovcloudapi.net",
            "mycluster.westeurope.cloudapp.azure.com",
        ] {
            assert!(
                request.extra_fqdns.contains(&expected.to_string()),
                "missing {}",
                expected
            );
        }
        assert_eq!(
            request.extra_fqdns.last().map(String::as_str),
            Some("api.example.com")
        );
    }

    #[test]
    fn mandatory_names_survive_duplicate_extras() {
        let mut request = PkiRequest::new(1);
        request.extra_fqdns = vec![
            "kubernetes".to_string(),
            "api.example.com".to_string(),
            "api.example.com".to_string(),
        ];

        let names = request.api_server_dns_names();
        assert_eq!(names.iter().filter(|n| *n == "kubernetes").count(), 1);
        assert_eq!(names.iter().filter(|n| *n == "api.example.com").count(), 1);
        for required in cluster_dns_names("cluster.local") {
            assert!(names.contains(&required), "missing {}", required);
        }
    }

    #[test]
    fn etcd_ips_add_loopback_once() {
        let mut request = PkiRequest::new(1);
        request.extra_ips = vec![ip("10.240.255.5"), ip("127.0.0.1")];
        assert_eq!(
            request.etcd_ips(),
            vec![ip("10.240.255.5"), ip("127.0.0.1")]
        );
    }

    #[test]
    fn custom_service_cidr_and_domain() {
        let mut def = definition(1);
        def.orchestrator_profile.kubernetes_config.service_cidr = "192.168.0.0/24".to_string();
        let request =
            PkiRequest::for_cluster(&def, "corp.internal").expect("request derivation should succeed");

        assert!(request.extra_ips.contains(&ip("192.168.0.1")));
        assert!(request
            .api_server_dns_names()
            .contains(&"kubernetes.default.svc.corp.internal".to_string()));
    }

    #[test]
    fn malformed_first_master_ip_names_the_field() {
        let mut def = definition(1);
        if let Some(master) = def.master_profile.as_mut() {
            master.first_consecutive_static_ip = "10.240.999.5".to_string();
        }
        let err = PkiRequest::for_cluster(&def, "cluster.local").expect_err("bad IP should fail");
        assert!(err.to_string().contains("firstConsecutiveStaticIP"));
    }

    #[test]
    fn certificate_profile_selects_supplied_ca() {
        let mut def = definition(1);
        def.certificate_profile = Some(CertificateProfile {
            ca_certificate: "cert".to_string(),
            ca_private_key: "key".to_string(),
            ..Default::default()
        });
        let request =
            PkiRequest::for_cluster(&def, "cluster.local").expect("request derivation should succeed");
        assert!(matches!(request.ca, CaSource::Supplied { .. }));
        assert!(request.supplied_leaves.is_empty());
    }

    fn profile_with_leaves(peers: usize) -> CertificateProfile {
        CertificateProfile {
            ca_certificate: "ca".to_string(),
            ca_private_key: "cakey".to_string(),
            api_server_certificate: "api".to_string(),
            api_server_private_key: "apikey".to_string(),
            kube_config_certificate: "kc".to_string(),
            etcd_server_certificate: "es".to_string(),
            etcd_server_private_key: "eskey".to_string(),
            etcd_client_certificate: "ec".to_string(),
            etcd_client_private_key: "eckey".to_string(),
            etcd_peer_certificates: (0..peers).map(|i| format!("peer{}", i)).collect(),
            etcd_peer_private_keys: (0..peers).map(|i| format!("peerkey{}", i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn complete_leaf_groups_are_reused_with_the_ca() {
        let mut def = definition(2);
        def.certificate_profile = Some(profile_with_leaves(2));
        let request =
            PkiRequest::for_cluster(&def, "cluster.local").expect("request derivation should succeed");

        let roles: Vec<LeafRole> = request.supplied_leaves.keys().copied().collect();
        assert_eq!(
            roles,
            vec![
                LeafRole::ApiServer,
                LeafRole::EtcdServer,
                LeafRole::EtcdClient,
                LeafRole::EtcdPeer(0),
                LeafRole::EtcdPeer(1),
            ]
        );
        let api = &request.supplied_leaves[&LeafRole::ApiServer];
        assert_eq!(api.certificate_pem, "api");
        assert_eq!(api.private_key_pem.as_str(), "apikey");
        assert_eq!(
            request.supplied_leaves[&LeafRole::EtcdPeer(1)].certificate_pem,
            "peer1"
        );
    }

    #[test]
    fn incomplete_etcd_group_is_regenerated_whole() {
        let mut def = definition(3);
        def.certificate_profile = Some(profile_with_leaves(2));
        let request =
            PkiRequest::for_cluster(&def, "cluster.local").expect("request derivation should succeed");

        assert!(request.supplied_leaves.contains_key(&LeafRole::ApiServer));
        assert!(!request
            .supplied_leaves
            .keys()
            .any(|role| matches!(role, LeafRole::EtcdServer | LeafRole::EtcdClient | LeafRole::EtcdPeer(_))));
    }

    #[test]
    fn leaves_without_a_ca_are_ignored() {
        let mut def = definition(2);
        let mut profile = profile_with_leaves(2);
        profile.ca_private_key.clear();
        def.certificate_profile = Some(profile);
        let request =
            PkiRequest::for_cluster(&def, "cluster.local").expect("request derivation should succeed");

        assert!(matches!(request.ca, CaSource::Generate));
        assert!(request.supplied_leaves.is_empty());
    }
}
