// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Server (leaf) certificate issuance signed by the local CA.

use crate::ca::{self, CaMaterial};
use crate::clock::Clock;
use crate::config::{LeafConfig, LeafRequest};
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::x509::{self, CertificateSummary};
use rand::{CryptoRng, RngCore};
use rcgen::{
    CertificateParams, DnType, ExtendedKeyUsagePurpose, Issuer, KeyUsagePurpose, SanType,
};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::{debug, info};

/// A leaf certificate and key, parsed and as PEM bytes ready for a TLS
/// stack.
#[derive(Debug, Clone)]
pub struct LeafMaterial {
    pub certificate: CertificateSummary,
    pub certificate_pem: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

/// Issues server certificates for a host set, reusing the on-disk pair when
/// it still covers exactly the requested hosts and is not near expiry.
pub struct ServerCertificateIssuer<F, C, R> {
    config: LeafConfig,
    filesystem: F,
    clock: C,
    rng: R,
}

impl<F, C, R> ServerCertificateIssuer<F, C, R>
where
    F: FileSystem,
    C: Clock,
    R: RngCore + CryptoRng,
{
    pub fn new(config: LeafConfig, filesystem: F, clock: C, rng: R) -> Self {
        Self {
            config,
            filesystem,
            clock,
            rng,
        }
    }

    pub fn issue(
        &mut self,
        ctx: &Context,
        ca_material: &CaMaterial,
        request: &LeafRequest,
    ) -> Result<LeafMaterial> {
        self.issue_inner(ctx, ca_material, request)
            .map_err(Error::server_certificate)
    }

    fn issue_inner(
        &mut self,
        ctx: &Context,
        ca_material: &CaMaterial,
        request: &LeafRequest,
    ) -> Result<LeafMaterial> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let hosts = normalize_hosts(&request.hosts)?;

        if let Some(material) = self.load_existing(request, &hosts) {
            debug!(
                not_after = material.certificate.not_after_timestamp,
                "reusing existing server certificate"
            );
            return Ok(material);
        }

        self.generate(ca_material, request, &hosts)
    }

    /// Reuse requires both files to parse, the stored SAN set to equal the
    /// requested host set, and validity past the renewal window. Reuse never
    /// writes to disk.
    fn load_existing(&self, request: &LeafRequest, hosts: &BTreeSet<String>) -> Option<LeafMaterial> {
        if !self.filesystem.exists(&request.certificate_path)
            || !self.filesystem.exists(&request.key_path)
        {
            return None;
        }

        let certificate_pem = self.filesystem.read(&request.certificate_path).ok()?;
        let private_key_pem = self.filesystem.read(&request.key_path).ok()?;

        let certificate = match x509::parse_certificate_pem(&certificate_pem) {
            Ok(summary) => summary,
            Err(error) => {
                debug!(%error, "stored server certificate is unreadable, reissuing");
                return None;
            }
        };
        if x509::parse_rsa_private_key_pem(&private_key_pem).is_err() {
            debug!("stored server key is unreadable, reissuing");
            return None;
        }

        if certificate.san_set() != *hosts {
            debug!("requested host set changed, reissuing");
            return None;
        }

        let renewal_threshold = self.clock.now() + self.config.renewal_window;
        if !certificate.valid_at(renewal_threshold) {
            debug!("server certificate is inside its renewal window, reissuing");
            return None;
        }

        Some(LeafMaterial {
            certificate,
            certificate_pem,
            private_key_pem,
        })
    }

    fn generate(
        &mut self,
        ca_material: &CaMaterial,
        request: &LeafRequest,
        hosts: &BTreeSet<String>,
    ) -> Result<LeafMaterial> {
        info!(hosts = ?hosts, "issuing server certificate");

        let private_key = RsaPrivateKey::new(&mut self.rng, self.config.key_bits)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let key_pair = ca::signing_key_pair(&private_key)?;

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, request.hosts[0].as_str());
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        params.serial_number = Some(ca::random_serial(&mut self.rng));
        params.subject_alt_names = subject_alt_names(hosts)?;

        let now = self.clock.now();
        params.not_before = now;
        params.not_after = now + self.config.validity;

        let ca_certificate_pem = std::str::from_utf8(&ca_material.certificate_pem)
            .map_err(|e| Error::CertParse(format!("CA certificate is not UTF-8: {e}")))?;
        let ca_key_pair = ca::signing_key_pair(&ca_material.private_key)?;
        let issuer = Issuer::from_ca_cert_pem(ca_certificate_pem, ca_key_pair)?;

        let certificate = params.signed_by(&key_pair, &issuer)?;
        let certificate_pem = certificate.pem().into_bytes();
        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?
            .as_bytes()
            .to_vec();

        self.filesystem.write(
            &request.certificate_path,
            &certificate_pem,
            self.config.certificate_mode,
        )?;
        self.filesystem
            .write(&request.key_path, &private_key_pem, self.config.key_mode)?;

        let summary = x509::parse_certificate_pem(&certificate_pem)?;
        Ok(LeafMaterial {
            certificate: summary,
            certificate_pem,
            private_key_pem,
        })
    }
}

/// Canonical host set: IP literals in their canonical textual form, DNS
/// names lower-cased. Empty and blank host lists are rejected.
fn normalize_hosts(hosts: &[String]) -> Result<BTreeSet<String>> {
    if hosts.is_empty() {
        return Err(Error::NoHosts);
    }

    let mut normalized = BTreeSet::new();
    for host in hosts {
        let trimmed = host.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidHost {
                host: host.clone(),
                reason: "host is empty".into(),
            });
        }
        match trimmed.parse::<IpAddr>() {
            Ok(ip) => normalized.insert(ip.to_string()),
            Err(_) => normalized.insert(trimmed.to_lowercase()),
        };
    }
    Ok(normalized)
}

fn subject_alt_names(hosts: &BTreeSet<String>) -> Result<Vec<SanType>> {
    let mut names = Vec::with_capacity(hosts.len());
    for host in hosts {
        match host.parse::<IpAddr>() {
            Ok(ip) => names.push(SanType::IpAddress(ip)),
            Err(_) => {
                let name = host.clone().try_into().map_err(|_| Error::InvalidHost {
                    host: host.clone(),
                    reason: "not a valid DNS name".into(),
                })?;
                names.push(SanType::DnsName(name));
            }
        }
    }
    Ok(names)
}
