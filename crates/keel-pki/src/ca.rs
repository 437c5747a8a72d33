//! Certificate authority operations
//!
//! The CA is either generated fresh (self-signed, 4096-bit RSA, two year
//! validity) or loaded from a supplied certificate/key pair. Leaf certificates
//! are issued from a [`LeafProfile`] and every issued leaf can be checked back
//! against the CA public key with [`CertificateAuthority::verify`].

use std::net::IpAddr;

use ::time::{Duration, OffsetDateTime};
use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, RsaKeySize, SanType,
    SerialNumber,
};
use tracing::debug;
use x509_parser::prelude::*;
use zeroize::Zeroizing;

use crate::error::{PkiError, Result};
use crate::PkiKeyCertPair;

/// Lifetime of the CA and every leaf certificate, in calendar years
pub const VALIDITY_YEARS: i32 = 2;

/// PEM label of an X.509 certificate block
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// RSA modulus size for every generated key
pub const KEY_SIZE_BITS: u32 = 4096;

/// Common name of a generated CA
pub const CA_COMMON_NAME: &str = "ca";

/// Validity window opening now and closing on the same calendar date
/// `years` later
fn validity_window(years: i32) -> (OffsetDateTime, OffsetDateTime) {
    let not_before = OffsetDateTime::now_utc();
    (not_before, add_calendar_years(not_before, years))
}

/// Shift by whole calendar years; February 29 lands on March 1 in a
/// non-leap target year
fn add_calendar_years(start: OffsetDateTime, years: i32) -> OffsetDateTime {
    let year = start.year() + years;
    start
        .replace_year(year)
        .or_else(|_| {
            start
                .replace_day(28)
                .and_then(|d| d.replace_year(year))
                .map(|d| d + Duration::days(1))
        })
        .unwrap_or_else(|_| start + Duration::days(365 * i64::from(years)))
}

/// Random positive 128-bit serial number
fn random_serial() -> SerialNumber {
    let bytes: [u8; 16] = rand::random();
    SerialNumber::from_slice(&bytes)
}

/// Generate a 4096-bit RSA key pair
pub(crate) fn generate_rsa_key(purpose: &str) -> Result<KeyPair> {
    KeyPair::generate_rsa_for(&rcgen::PKCS_RSA_SHA256, RsaKeySize::_4096).map_err(|e| {
        PkiError::KeyGenerationFailed(format!("failed to generate {} key: {}", purpose, e))
    })
}

/// DER bytes of a PEM certificate block
///
/// A block with any other label, such as a private key pasted where the
/// certificate belongs, is rejected as [`PkiError::InvalidPem`].
pub fn certificate_der(pem_data: &str) -> Result<Vec<u8>> {
    let block = ::pem::parse(pem_data)
        .map_err(|e| PkiError::InvalidPem(format!("certificate is not PEM: {}", e)))?;
    if block.tag() != CERTIFICATE_LABEL {
        return Err(PkiError::InvalidPem(format!(
            "expected a {} block, found {}",
            CERTIFICATE_LABEL,
            block.tag()
        )));
    }
    Ok(block.into_contents())
}

/// Extended key usages a leaf certificate carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafUsage {
    /// TLS server authentication only
    Server,
    /// TLS client authentication only
    Client,
    /// Both server and client authentication
    ServerAndClient,
}

impl LeafUsage {
    fn extended_key_usages(self) -> Vec<ExtendedKeyUsagePurpose> {
        match self {
            Self::Server => vec![ExtendedKeyUsagePurpose::ServerAuth],
            Self::Client => vec![ExtendedKeyUsagePurpose::ClientAuth],
            Self::ServerAndClient => vec![
                ExtendedKeyUsagePurpose::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth,
            ],
        }
    }
}

/// Subject and extensions of one leaf certificate
#[derive(Clone, Debug)]
pub struct LeafProfile {
    /// Subject common name
    pub common_name: String,
    /// Subject organization, if any
    pub organization: Option<String>,
    /// Extended key usage
    pub usage: LeafUsage,
    /// DNS subject alternative names
    pub dns_names: Vec<String>,
    /// IP subject alternative names
    pub ip_addresses: Vec<IpAddr>,
}

impl LeafProfile {
    /// Profile with no SANs and no organization
    pub fn new(common_name: impl Into<String>, usage: LeafUsage) -> Self {
        Self {
            common_name: common_name.into(),
            organization: None,
            usage,
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
        }
    }

    /// Set the subject organization
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the DNS SANs
    pub fn with_dns_names(mut self, names: Vec<String>) -> Self {
        self.dns_names = names;
        self
    }

    /// Set the IP SANs
    pub fn with_ip_addresses(mut self, ips: Vec<IpAddr>) -> Self {
        self.ip_addresses = ips;
        self
    }

    fn to_params(&self) -> Result<CertificateParams> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(
            DnType::CommonName,
            DnValue::Utf8String(self.common_name.clone()),
        );
        if let Some(org) = &self.organization {
            dn.push(DnType::OrganizationName, DnValue::Utf8String(org.clone()));
        }
        params.distinguished_name = dn;

        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = self.usage.extended_key_usages();
        params.serial_number = Some(random_serial());

        let (not_before, not_after) = validity_window(VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        let mut sans = Vec::with_capacity(self.dns_names.len() + self.ip_addresses.len());
        for name in &self.dns_names {
            let dns = Ia5String::try_from(name.clone()).map_err(|e| {
                PkiError::CertificateGenerationFailed(format!(
                    "invalid DNS name '{}' for {}: {}",
                    name, self.common_name, e
                ))
            })?;
            sans.push(SanType::DnsName(dns));
        }
        sans.extend(self.ip_addresses.iter().copied().map(SanType::IpAddress));
        params.subject_alt_names = sans;

        Ok(params)
    }
}

/// Certificate authority shared read-only by every signing task
#[derive(Clone)]
pub struct CertificateAuthority {
    cert_pem: String,
    key_pem: Zeroizing<String>,
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

impl CertificateAuthority {
    /// Create a new self-signed CA with a fresh 4096-bit RSA key
    pub fn generate() -> Result<Self> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(
            DnType::CommonName,
            DnValue::Utf8String(CA_COMMON_NAME.to_string()),
        );
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.serial_number = Some(random_serial());

        let (not_before, not_after) = validity_window(VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        let key_pair = generate_rsa_key("CA")?;
        let key_pem = Zeroizing::new(key_pair.serialize_pem());

        let cert = params.self_signed(&key_pair).map_err(|e| {
            PkiError::CertificateGenerationFailed(format!("failed to create CA cert: {}", e))
        })?;

        debug!("generated self-signed CA");
        Ok(Self {
            cert_pem: cert.pem(),
            key_pem,
        })
    }

    /// Load a supplied CA certificate and private key
    ///
    /// Both PEM blocks must decode and parse, and the key must be the one the
    /// certificate was issued for.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        let cert_der = certificate_der(cert_pem)?;
        let (_, cert) = X509Certificate::from_der(&cert_der)
            .map_err(|e| PkiError::InvalidPem(format!("failed to parse CA certificate: {}", e)))?;

        let key_pair = KeyPair::from_pem(key_pem)
            .map_err(|e| PkiError::InvalidPem(format!("failed to parse CA key: {}", e)))?;

        if cert.public_key().subject_public_key.data.as_ref() != key_pair.public_key_raw() {
            return Err(PkiError::InvalidPem(
                "CA private key does not match the CA certificate".to_string(),
            ));
        }

        Ok(Self {
            cert_pem: cert_pem.to_string(),
            key_pem: Zeroizing::new(key_pem.to_string()),
        })
    }

    /// CA certificate in PEM format
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// CA private key in PEM format
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// CA certificate and key as a pair
    pub fn to_pair(&self) -> PkiKeyCertPair {
        PkiKeyCertPair {
            certificate_pem: self.cert_pem.clone(),
            private_key_pem: self.key_pem.clone(),
        }
    }

    fn load_key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_pem(&self.key_pem)
            .map_err(|e| PkiError::ParseError(format!("failed to load CA key: {}", e)))
    }

    /// Generate a fresh key pair and issue a certificate for it
    pub fn issue(&self, profile: &LeafProfile) -> Result<PkiKeyCertPair> {
        let params = profile.to_params()?;

        let leaf_key = generate_rsa_key(&profile.common_name)?;
        let private_key_pem = Zeroizing::new(leaf_key.serialize_pem());

        let ca_key = self.load_key_pair()?;
        let issuer = Issuer::from_ca_cert_pem(&self.cert_pem, &ca_key)
            .map_err(|e| PkiError::ParseError(format!("failed to create issuer: {}", e)))?;

        let cert = params.signed_by(&leaf_key, &issuer).map_err(|e| {
            PkiError::CertificateGenerationFailed(format!(
                "failed to sign {} cert: {}",
                profile.common_name, e
            ))
        })?;

        Ok(PkiKeyCertPair {
            certificate_pem: cert.pem(),
            private_key_pem,
        })
    }

    /// Check that a PEM certificate was signed by this CA
    pub fn verify(&self, leaf_pem: &str) -> Result<()> {
        let leaf_der = certificate_der(leaf_pem)?;
        let (_, leaf) = X509Certificate::from_der(&leaf_der)
            .map_err(|e| PkiError::ParseError(format!("failed to parse certificate: {}", e)))?;

        let ca_der = certificate_der(&self.cert_pem)?;
        let (_, ca) = X509Certificate::from_der(&ca_der)
            .map_err(|e| PkiError::ParseError(format!("failed to parse CA certificate: {}", e)))?;

        leaf.verify_signature(Some(ca.public_key()))
            .map_err(|e| PkiError::SignatureMismatch {
                subject: common_name(&leaf),
                reason: e.to_string(),
            })
    }
}

fn common_name(cert: &X509Certificate<'_>) -> String {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pem: &str) -> Vec<u8> {
        certificate_der(pem).expect("PEM parsing should succeed")
    }

    #[test]
    fn generated_ca_is_a_cert_signing_ca() {
        let ca = CertificateAuthority::generate().expect("CA creation should succeed");
        assert!(ca.cert_pem().contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem().contains("PRIVATE KEY"));

        let der = parse(ca.cert_pem());
        let (_, cert) = X509Certificate::from_der(&der).expect("CA cert should parse");
        assert!(cert.is_ca());
        let usage = cert
            .key_usage()
            .expect("key usage extension should parse")
            .expect("key usage should be present");
        assert!(usage.value.key_cert_sign());

        let not_before = cert.validity().not_before.to_datetime();
        let not_after = cert.validity().not_after.to_datetime();
        assert_eq!(not_after, add_calendar_years(not_before, VALIDITY_YEARS));
    }

    fn utc(year: i32, month: ::time::Month, day: u8) -> OffsetDateTime {
        ::time::Date::from_calendar_date(year, month, day)
            .expect("valid calendar date")
            .with_hms(12, 30, 0)
            .expect("valid time")
            .assume_utc()
    }

    #[test]
    fn validity_spans_calendar_years_not_fixed_days() {
        use ::time::Month;

        // Crosses the 2028 leap day, so two years is 731 days
        let start = utc(2027, Month::March, 15);
        let end = add_calendar_years(start, 2);
        assert_eq!(end, utc(2029, Month::March, 15));
        assert_eq!((end - start).whole_days(), 731);

        // A leap day start rolls to March 1
        assert_eq!(
            add_calendar_years(utc(2028, Month::February, 29), 2),
            utc(2030, Month::March, 1)
        );
    }

    #[test]
    fn certificate_der_rejects_other_blocks() {
        let ca = CertificateAuthority::generate().expect("CA creation should succeed");

        match certificate_der(ca.key_pem()) {
            Err(PkiError::InvalidPem(reason)) => {
                assert!(reason.contains("CERTIFICATE"), "{}", reason);
                assert!(reason.contains("PRIVATE KEY"), "{}", reason);
            }
            other => panic!("expected InvalidPem, got {:?}", other.map(|der| der.len())),
        }

        let err = CertificateAuthority::from_pem(ca.key_pem(), ca.key_pem())
            .expect_err("a key in the certificate slot should be rejected");
        assert!(matches!(err, PkiError::InvalidPem(_)));
    }

    #[test]
    fn issued_leaf_carries_profile_sans() {
        let ca = CertificateAuthority::generate().expect("CA creation should succeed");
        let profile = LeafProfile::new("apiserver", LeafUsage::Server)
            .with_dns_names(vec!["kubernetes".to_string(), "kubernetes.default".to_string()])
            .with_ip_addresses(vec!["10.240.255.5".parse().expect("valid IP")]);

        let pair = ca.issue(&profile).expect("issuing should succeed");
        ca.verify(&pair.certificate_pem)
            .expect("leaf should verify against its CA");

        let der = parse(&pair.certificate_pem);
        let (_, cert) = X509Certificate::from_der(&der).expect("leaf should parse");
        assert_eq!(common_name(&cert), "apiserver");
        let san = cert
            .subject_alternative_name()
            .expect("SAN extension should parse")
            .expect("SAN should be present");
        assert_eq!(san.value.general_names.len(), 3);
    }

    #[test]
    fn invalid_dns_name_is_rejected_before_key_generation() {
        let ca = CertificateAuthority::generate().expect("CA creation should succeed");
        let profile = LeafProfile::new("apiserver", LeafUsage::Server)
            .with_dns_names(vec!["kübernetes".to_string()]);

        let err = ca.issue(&profile).expect_err("non-ASCII DNS name should fail");
        assert!(matches!(err, PkiError::CertificateGenerationFailed(_)));
    }

    #[test]
    fn supplied_ca_round_trips() {
        let generated = CertificateAuthority::generate().expect("CA creation should succeed");
        let loaded = CertificateAuthority::from_pem(generated.cert_pem(), generated.key_pem())
            .expect("loading a matching pair should succeed");

        let pair = loaded
            .issue(&LeafProfile::new("client", LeafUsage::Client))
            .expect("issuing should succeed");
        generated
            .verify(&pair.certificate_pem)
            .expect("leaf from loaded CA should verify against original");
    }

    #[test]
    fn malformed_supplied_ca_is_invalid_pem() {
        let err = CertificateAuthority::from_pem("not a pem", "also not a pem")
            .expect_err("garbage should be rejected");
        assert!(matches!(err, PkiError::InvalidPem(_)));
    }

    #[test]
    fn mismatched_supplied_key_is_invalid_pem() {
        let first = CertificateAuthority::generate().expect("CA creation should succeed");
        let second = CertificateAuthority::generate().expect("CA creation should succeed");

        let err = CertificateAuthority::from_pem(first.cert_pem(), second.key_pem())
            .expect_err("mismatched key should be rejected");
        assert!(matches!(err, PkiError::InvalidPem(_)));
    }

    #[test]
    fn leaf_from_other_ca_is_signature_mismatch() {
        let trusted = CertificateAuthority::generate().expect("CA creation should succeed");
        let rogue = CertificateAuthority::generate().expect("CA creation should succeed");
        let pair = rogue
            .issue(&LeafProfile::new("etcdclient", LeafUsage::Client))
            .expect("issuing should succeed");

        match trusted.verify(&pair.certificate_pem) {
            Err(PkiError::SignatureMismatch { subject, .. }) => assert_eq!(subject, "etcdclient"),
            other => panic!("expected SignatureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let ca = CertificateAuthority::generate().expect("CA creation should succeed");
        let rendered = format!("{:?}", ca);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("PRIVATE KEY"));
    }
}
