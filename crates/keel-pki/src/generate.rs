//! Concurrent generation of the cluster trust hierarchy
//!
//! One CA (generated or supplied) signs `master_count + 5` leaf certificates:
//! API server, client, kubeconfig, etcd server, etcd client, and one etcd peer
//! per master. Each leaf is keyed and signed on its own blocking task. Leaf
//! pairs supplied alongside a supplied CA are reused as-is and only verified.
//! The first failure cancels the tasks that have not started, waits for the rest
//! to finish, and is returned; keys produced by tasks that did finish are
//! dropped, which wipes them.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ca::{CertificateAuthority, LeafProfile, LeafUsage};
use crate::error::{PkiError, Result};
use crate::request::{CaSource, PkiRequest};
use crate::PkiKeyCertPair;

/// Organization granting cluster-admin to client certificates
pub const MASTERS_ORGANIZATION: &str = "system:masters";

/// Leaf certificates every cluster gets besides the per-master etcd peers
pub const FIXED_LEAF_COUNT: u32 = 5;

/// Identity of one leaf signing job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LeafRole {
    /// API server serving certificate
    ApiServer,
    /// Admin client certificate
    Client,
    /// Kubeconfig client certificate
    Kubeconfig,
    /// etcd server certificate
    EtcdServer,
    /// etcd client certificate
    EtcdClient,
    /// etcd peer certificate for the master with this index
    EtcdPeer(u32),
}

impl LeafRole {
    /// All roles for a cluster with `master_count` masters
    pub fn all(master_count: u32) -> Vec<LeafRole> {
        let mut roles = vec![
            LeafRole::ApiServer,
            LeafRole::Client,
            LeafRole::Kubeconfig,
            LeafRole::EtcdServer,
            LeafRole::EtcdClient,
        ];
        roles.extend((0..master_count).map(LeafRole::EtcdPeer));
        roles
    }

    /// Certificate subject and extensions for this role
    pub fn profile(self, request: &PkiRequest) -> LeafProfile {
        match self {
            LeafRole::ApiServer => LeafProfile::new("apiserver", LeafUsage::Server)
                .with_dns_names(request.api_server_dns_names())
                .with_ip_addresses(request.api_server_ips()),
            LeafRole::Client => LeafProfile::new("client", LeafUsage::Client)
                .with_organization(MASTERS_ORGANIZATION),
            LeafRole::Kubeconfig => LeafProfile::new("client", LeafUsage::Client)
                .with_organization(MASTERS_ORGANIZATION),
            LeafRole::EtcdServer => LeafProfile::new("etcdserver", LeafUsage::ServerAndClient)
                .with_ip_addresses(request.etcd_ips()),
            LeafRole::EtcdClient => LeafProfile::new("etcdclient", LeafUsage::Client)
                .with_ip_addresses(request.etcd_ips()),
            LeafRole::EtcdPeer(index) => {
                LeafProfile::new(format!("etcdpeer{}", index), LeafUsage::ServerAndClient)
                    .with_ip_addresses(request.etcd_ips())
            }
        }
    }
}

impl std::fmt::Display for LeafRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafRole::ApiServer => f.write_str("apiserver"),
            LeafRole::Client => f.write_str("client"),
            LeafRole::Kubeconfig => f.write_str("kubeconfig"),
            LeafRole::EtcdServer => f.write_str("etcd-server"),
            LeafRole::EtcdClient => f.write_str("etcd-client"),
            LeafRole::EtcdPeer(i) => write!(f, "etcd-peer-{}", i),
        }
    }
}

/// Every key/cert pair of a cluster
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PkiBundle {
    /// CA pair
    pub ca: PkiKeyCertPair,
    /// API server serving pair
    pub api_server: PkiKeyCertPair,
    /// Admin client pair
    pub client: PkiKeyCertPair,
    /// Kubeconfig client pair
    pub kubeconfig: PkiKeyCertPair,
    /// etcd server pair
    pub etcd_server: PkiKeyCertPair,
    /// etcd client pair
    pub etcd_client: PkiKeyCertPair,
    /// One etcd peer pair per master, in master order
    pub etcd_peers: Vec<PkiKeyCertPair>,
}

impl PkiBundle {
    /// All leaf pairs with their roles
    pub fn leaves(&self) -> Vec<(LeafRole, &PkiKeyCertPair)> {
        let mut leaves = vec![
            (LeafRole::ApiServer, &self.api_server),
            (LeafRole::Client, &self.client),
            (LeafRole::Kubeconfig, &self.kubeconfig),
            (LeafRole::EtcdServer, &self.etcd_server),
            (LeafRole::EtcdClient, &self.etcd_client),
        ];
        leaves.extend(
            self.etcd_peers
                .iter()
                .enumerate()
                .map(|(i, pair)| (LeafRole::EtcdPeer(i as u32), pair)),
        );
        leaves
    }
}

fn load_ca(source: &CaSource) -> Result<CertificateAuthority> {
    match source {
        CaSource::Generate => CertificateAuthority::generate(),
        CaSource::Supplied {
            certificate_pem,
            private_key_pem,
        } => CertificateAuthority::from_pem(certificate_pem, private_key_pem),
    }
}

/// Generate the full trust hierarchy for a request
pub async fn generate_pki(mut request: PkiRequest) -> Result<PkiBundle> {
    let supplied = std::mem::take(&mut request.supplied_leaves);
    let supplied = match request.ca {
        CaSource::Supplied { .. } => supplied,
        CaSource::Generate => {
            if !supplied.is_empty() {
                warn!(
                    leaves = supplied.len(),
                    "ignoring supplied leaf certificates without their CA"
                );
            }
            Default::default()
        }
    };
    let request = Arc::new(request);

    let ca = match &request.ca {
        CaSource::Generate => {
            let source = request.ca.clone();
            tokio::task::spawn_blocking(move || load_ca(&source)).await??
        }
        source => load_ca(source)?,
    };
    let ca = Arc::new(ca);

    let roles: Vec<LeafRole> = LeafRole::all(request.master_count)
        .into_iter()
        .filter(|role| !supplied.contains_key(role))
        .collect();
    let expected = roles.len();
    debug!(
        jobs = expected,
        reused = supplied.len(),
        "spawning leaf signing tasks"
    );

    let mut tasks = JoinSet::new();
    for role in roles {
        let ca = Arc::clone(&ca);
        let request = Arc::clone(&request);
        tasks.spawn_blocking(move || {
            let profile = role.profile(&request);
            (role, ca.issue(&profile))
        });
    }

    let mut issued = Vec::with_capacity(expected);
    let mut first_error: Option<PkiError> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok((role, Ok(pair))) => Ok((role, pair)),
            Ok((role, Err(e))) => {
                warn!(role = %role, error = %e, "leaf signing failed");
                Err(e)
            }
            Err(e) if e.is_cancelled() => continue,
            Err(e) => Err(PkiError::from(e)),
        };

        match outcome {
            Ok(leaf) if first_error.is_none() => issued.push(leaf),
            Ok(_) => {}
            Err(e) => {
                if first_error.is_none() {
                    tasks.abort_all();
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    if issued.len() != expected {
        return Err(PkiError::TaskFailed(format!(
            "expected {} signed certificates, collected {}",
            expected,
            issued.len()
        )));
    }

    issued.extend(supplied);
    for (role, pair) in &issued {
        ca.verify(&pair.certificate_pem).map_err(|e| {
            warn!(role = %role, error = %e, "certificate failed verification");
            e
        })?;
    }

    let bundle = assemble(ca.to_pair(), issued)?;
    info!(
        etcd_peers = bundle.etcd_peers.len(),
        "generated cluster PKI"
    );
    Ok(bundle)
}

fn assemble(ca: PkiKeyCertPair, mut issued: Vec<(LeafRole, PkiKeyCertPair)>) -> Result<PkiBundle> {
    issued.sort_by_key(|(role, _)| *role);

    let mut api_server = None;
    let mut client = None;
    let mut kubeconfig = None;
    let mut etcd_server = None;
    let mut etcd_client = None;
    let mut etcd_peers = Vec::new();

    for (role, pair) in issued {
        match role {
            LeafRole::ApiServer => api_server = Some(pair),
            LeafRole::Client => client = Some(pair),
            LeafRole::Kubeconfig => kubeconfig = Some(pair),
            LeafRole::EtcdServer => etcd_server = Some(pair),
            LeafRole::EtcdClient => etcd_client = Some(pair),
            LeafRole::EtcdPeer(_) => etcd_peers.push(pair),
        }
    }

    let missing = |role: LeafRole| PkiError::TaskFailed(format!("no certificate collected for {}", role));
    Ok(PkiBundle {
        ca,
        api_server: api_server.ok_or_else(|| missing(LeafRole::ApiServer))?,
        client: client.ok_or_else(|| missing(LeafRole::Client))?,
        kubeconfig: kubeconfig.ok_or_else(|| missing(LeafRole::Kubeconfig))?,
        etcd_server: etcd_server.ok_or_else(|| missing(LeafRole::EtcdServer))?,
        etcd_client: etcd_client.ok_or_else(|| missing(LeafRole::EtcdClient))?,
        etcd_peers,
    })
}
