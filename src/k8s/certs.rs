//! Self-signed TLS material for exposed endpoints

use chrono::{Datelike, Duration, Utc};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, DnValue, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, PKCS_RSA_SHA256,
};
use thiserror::Error;

/// Validity of an issued certificate
pub const VALIDITY_DAYS: i64 = 180;

const ORGANIZATION: &str = "Eclipse Codewind";

#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to generate key for {dns_name}: {message}")]
    KeyGeneration { dns_name: String, message: String },

    #[error("failed to create certificate for {dns_name}: {message}")]
    Certificate { dns_name: String, message: String },
}

/// A PEM encoded private key and the certificate issued for it
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub key_pem: String,
    pub cert_pem: String,
}

/// Issue a self-signed certificate for `dns_name`.
///
/// The key is 2048-bit RSA and the certificate carries `dns_name` as its only
/// SAN with the ServerAuth extended key usage.
pub fn issue(dns_name: &str, title: &str) -> Result<IssuedCertificate, CertError> {
    let cert_err = |e: rcgen::Error| CertError::Certificate {
        dns_name: dns_name.to_string(),
        message: e.to_string(),
    };

    let mut params = CertificateParams::new(vec![dns_name.to_string()]).map_err(cert_err)?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, DnValue::Utf8String(title.to_string()));
    dn.push(DnType::OrganizationName, DnValue::Utf8String(ORGANIZATION.to_string()));
    params.distinguished_name = dn;

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    let start = Utc::now();
    let end = start + Duration::days(VALIDITY_DAYS);
    params.not_before = rcgen::date_time_ymd(start.year(), start.month() as u8, start.day() as u8);
    params.not_after = rcgen::date_time_ymd(end.year(), end.month() as u8, end.day() as u8);

    let key = KeyPair::generate_for(&PKCS_RSA_SHA256).map_err(|e| CertError::KeyGeneration {
        dns_name: dns_name.to_string(),
        message: e.to_string(),
    })?;

    let cert = params.self_signed(&key).map_err(cert_err)?;

    tracing::debug!(dns_name, "issued self-signed certificate");

    Ok(IssuedCertificate {
        key_pem: key.serialize_pem(),
        cert_pem: cert.pem(),
    })
}
