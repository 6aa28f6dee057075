// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Parse persisted PEM material back into owned summaries, without shelling
//! out to openssl.

use crate::error::{Error, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use std::collections::BTreeSet;
use std::net::IpAddr;
use ::time::OffsetDateTime;
use x509_parser::prelude::*;

const CERTIFICATE_PEM_TAG: &str = "CERTIFICATE";
const RSA_PRIVATE_KEY_PEM_TAG: &str = "RSA PRIVATE KEY";

/// An owned view of the fields the lifecycle decisions need.
#[derive(Debug, Clone)]
pub struct CertificateSummary {
    /// Raw serial number bytes, byte-identical across reuse.
    pub serial: Vec<u8>,
    pub not_before_timestamp: i64,
    pub not_after_timestamp: i64,
    pub common_name: Option<String>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub is_ca: bool,
}

impl CertificateSummary {
    /// True while `instant` is strictly before NotAfter.
    pub fn valid_at(&self, instant: OffsetDateTime) -> bool {
        instant.unix_timestamp() < self.not_after_timestamp
    }

    /// Normalized SAN set: lower-cased DNS names plus canonical IP strings,
    /// order-independent. Used for host-set equality on rotation decisions.
    pub fn san_set(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = self
            .dns_names
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        set.extend(self.ip_addresses.iter().map(|ip| ip.to_string()));
        set
    }
}

pub fn parse_certificate_pem(pem_bytes: &[u8]) -> Result<CertificateSummary> {
    let block =
        ::pem::parse(pem_bytes).map_err(|e| Error::CertParse(format!("invalid PEM: {e}")))?;
    if block.tag() != CERTIFICATE_PEM_TAG {
        return Err(Error::CertParse(format!(
            "expected {CERTIFICATE_PEM_TAG} block, got {}",
            block.tag()
        )));
    }

    let (_, certificate) = X509Certificate::from_der(block.contents())
        .map_err(|e| Error::CertParse(format!("invalid X.509: {e}")))?;

    let common_name = certificate
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from);

    let mut dns_names = Vec::new();
    let mut ip_addresses = Vec::new();
    let mut is_ca = false;

    for extension in certificate.extensions() {
        match extension.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                        GeneralName::IPAddress(bytes) if bytes.len() == 4 => {
                            let octets = [bytes[0], bytes[1], bytes[2], bytes[3]];
                            ip_addresses.push(IpAddr::from(octets));
                        }
                        GeneralName::IPAddress(bytes) if bytes.len() == 16 => {
                            if let Ok(octets) = <[u8; 16]>::try_from(*bytes) {
                                ip_addresses.push(IpAddr::from(octets));
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::BasicConstraints(bc) => {
                is_ca = bc.ca;
            }
            _ => {}
        }
    }

    Ok(CertificateSummary {
        serial: certificate.raw_serial().to_vec(),
        not_before_timestamp: certificate.validity().not_before.timestamp(),
        not_after_timestamp: certificate.validity().not_after.timestamp(),
        common_name,
        dns_names,
        ip_addresses,
        is_ca,
    })
}

/// Parse a PKCS#1 `RSA PRIVATE KEY` PEM block.
pub fn parse_rsa_private_key_pem(pem_bytes: &[u8]) -> Result<RsaPrivateKey> {
    let block = ::pem::parse(pem_bytes).map_err(|e| Error::KeyParse(format!("invalid PEM: {e}")))?;
    if block.tag() != RSA_PRIVATE_KEY_PEM_TAG {
        return Err(Error::KeyParse(format!(
            "expected {RSA_PRIVATE_KEY_PEM_TAG} block, got {}",
            block.tag()
        )));
    }
    RsaPrivateKey::from_pkcs1_der(block.contents())
        .map_err(|e| Error::KeyParse(format!("invalid PKCS#1 key: {e}")))
}
