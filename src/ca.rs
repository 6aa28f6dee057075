// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Certificate authority lifecycle: load, reuse, or regenerate the root
//! key pair and self-signed certificate.

use crate::clock::Clock;
use crate::config::CaConfig;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::x509::{self, CertificateSummary};
use rand::{CryptoRng, RngCore};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use rustls_pki_types::PrivatePkcs8KeyDer;
use tracing::{debug, info};

const SERIAL_NUMBER_BYTES: usize = 20;

/// The CA's certificate and key, in parsed and PEM form. Regeneration
/// produces a fresh value; existing material is never mutated.
#[derive(Debug, Clone)]
pub struct CaMaterial {
    pub certificate: CertificateSummary,
    pub private_key: RsaPrivateKey,
    pub certificate_pem: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

/// Owns the CA lifecycle decision: reuse what is on disk while it stays
/// outside the renewal window, otherwise mint a replacement.
pub struct CertificateAuthorityManager<F, C, R> {
    config: CaConfig,
    filesystem: F,
    clock: C,
    rng: R,
}

impl<F, C, R> CertificateAuthorityManager<F, C, R>
where
    F: FileSystem,
    C: Clock,
    R: RngCore + CryptoRng,
{
    pub fn new(config: CaConfig, filesystem: F, clock: C, rng: R) -> Self {
        Self {
            config,
            filesystem,
            clock,
            rng,
        }
    }

    pub fn config(&self) -> &CaConfig {
        &self.config
    }

    /// Return usable CA material, generating it when missing, unparseable,
    /// or inside the renewal window.
    pub fn ensure(&mut self, ctx: &Context) -> Result<CaMaterial> {
        self.ensure_inner(ctx).map_err(Error::certificate_authority)
    }

    fn ensure_inner(&mut self, ctx: &Context) -> Result<CaMaterial> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Some(material) = self.load_existing() {
            debug!(
                not_after = material.certificate.not_after_timestamp,
                "reusing existing certificate authority"
            );
            return Ok(material);
        }

        self.generate()
    }

    /// Existing material is reusable only when both files parse and the
    /// certificate stays valid past the renewal window. Any failure here is
    /// a regeneration signal, not an error.
    fn load_existing(&self) -> Option<CaMaterial> {
        let certificate_path = self.config.certificate_path();
        let key_path = self.config.key_path();
        if !self.filesystem.exists(&certificate_path) || !self.filesystem.exists(&key_path) {
            return None;
        }

        let certificate_pem = self.filesystem.read(&certificate_path).ok()?;
        let private_key_pem = self.filesystem.read(&key_path).ok()?;

        let certificate = match x509::parse_certificate_pem(&certificate_pem) {
            Ok(summary) => summary,
            Err(error) => {
                debug!(%error, "stored CA certificate is unreadable, regenerating");
                return None;
            }
        };
        let private_key = match x509::parse_rsa_private_key_pem(&private_key_pem) {
            Ok(key) => key,
            Err(error) => {
                debug!(%error, "stored CA key is unreadable, regenerating");
                return None;
            }
        };

        let renewal_threshold = self.clock.now() + self.config.renewal_window;
        if !certificate.valid_at(renewal_threshold) {
            debug!("CA certificate is inside its renewal window, regenerating");
            return None;
        }

        Some(CaMaterial {
            certificate,
            private_key,
            certificate_pem,
            private_key_pem,
        })
    }

    fn generate(&mut self) -> Result<CaMaterial> {
        info!(
            bits = self.config.key_bits,
            "generating certificate authority"
        );
        self.filesystem
            .ensure_dir(&self.config.directory, self.config.directory_mode)?;

        let private_key = RsaPrivateKey::new(&mut self.rng, self.config.key_bits)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?;
        let key_pair = signing_key_pair(&private_key)?;

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, self.config.common_name.as_str());
        params
            .distinguished_name
            .push(DnType::OrganizationName, self.config.organization.as_str());
        params.distinguished_name.push(
            DnType::OrganizationalUnitName,
            self.config.organizational_unit.as_str(),
        );
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.serial_number = Some(random_serial(&mut self.rng));

        let now = self.clock.now();
        params.not_before = now;
        params.not_after = now + self.config.validity;

        let certificate = params.self_signed(&key_pair)?;
        let certificate_pem = certificate.pem().into_bytes();
        let private_key_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::KeyGeneration(e.to_string()))?
            .as_bytes()
            .to_vec();

        self.filesystem.write(
            &self.config.certificate_path(),
            &certificate_pem,
            self.config.certificate_mode,
        )?;
        self.filesystem
            .write(&self.config.key_path(), &private_key_pem, self.config.key_mode)?;

        let summary = x509::parse_certificate_pem(&certificate_pem)?;
        Ok(CaMaterial {
            certificate: summary,
            private_key,
            certificate_pem,
            private_key_pem,
        })
    }
}

/// Bridge an RSA key into an rcgen signing key pair via its PKCS#8 encoding.
pub(crate) fn signing_key_pair(private_key: &RsaPrivateKey) -> Result<KeyPair> {
    let pkcs8_der = private_key
        .to_pkcs8_der()
        .map_err(|e| Error::KeyGeneration(e.to_string()))?;
    let der = PrivatePkcs8KeyDer::from(pkcs8_der.as_bytes().to_vec());
    Ok(KeyPair::from_pkcs8_der_and_sign_algo(
        &der,
        &rcgen::PKCS_RSA_SHA256,
    )?)
}

/// 20 random bytes with the top bit cleared, keeping the encoded serial
/// positive and within RFC 5280's 20-octet limit.
pub(crate) fn random_serial<R: RngCore + CryptoRng>(rng: &mut R) -> SerialNumber {
    let mut bytes = [0u8; SERIAL_NUMBER_BYTES];
    rng.fill_bytes(&mut bytes);
    bytes[0] &= 0x7f;
    SerialNumber::from(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::fs::OsFileSystem;
    use crate::testutil::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;
    use time::{Duration, OffsetDateTime};

    fn test_config(directory: &Path) -> CaConfig {
        let mut config = CaConfig::new(directory.to_path_buf());
        config.key_bits = 2048;
        config.validity = Duration::days(90);
        config.renewal_window = Duration::days(7);
        config
    }

    fn manager(
        directory: &Path,
        clock: ManualClock,
    ) -> CertificateAuthorityManager<OsFileSystem, ManualClock, StdRng> {
        CertificateAuthorityManager::new(
            test_config(directory),
            OsFileSystem,
            clock,
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_ensure_creates_material() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let mut manager = manager(dir.path(), clock.clone());

        let material = manager.ensure(&Context::background()).unwrap();

        assert!(material.certificate.is_ca);
        assert_eq!(
            material.certificate.common_name.as_deref(),
            Some(crate::config::CA_COMMON_NAME)
        );
        let lifetime =
            material.certificate.not_after_timestamp - material.certificate.not_before_timestamp;
        assert!(lifetime >= Duration::days(90).whole_seconds());
        assert!(dir.path().join("ca.pem").exists());
        assert!(dir.path().join("ca.key").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_applies_configured_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let mut manager = manager(dir.path(), clock);
        manager.ensure(&Context::background()).unwrap();

        for name in ["ca.pem", "ca.key"] {
            let mode = std::fs::metadata(dir.path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600, "{name}");
        }
    }

    #[test]
    fn test_ensure_reuses_fresh_material() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let mut manager = manager(dir.path(), clock);

        let first = manager.ensure(&Context::background()).unwrap();
        let second = manager.ensure(&Context::background()).unwrap();

        assert_eq!(first.certificate.serial, second.certificate.serial);
    }

    #[test]
    fn test_ensure_rotates_inside_renewal_window() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let mut manager = manager(dir.path(), clock.clone());

        let first = manager.ensure(&Context::background()).unwrap();
        // 90-day validity, 7-day renewal window: 84 days in, rotation is due.
        clock.advance(Duration::days(84));
        let second = manager.ensure(&Context::background()).unwrap();

        assert_ne!(first.certificate.serial, second.certificate.serial);
    }

    #[test]
    fn test_ensure_regenerates_on_corrupt_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap());
        let mut manager = manager(dir.path(), clock);

        manager.ensure(&Context::background()).unwrap();
        std::fs::write(dir.path().join("ca.pem"), b"garbage").unwrap();

        let material = manager.ensure(&Context::background()).unwrap();
        assert!(material.certificate.is_ca);
    }

    #[test]
    fn test_cancelled_context_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = CertificateAuthorityManager::new(
            test_config(dir.path()),
            OsFileSystem,
            SystemClock,
            StdRng::seed_from_u64(7),
        );

        let ctx = Context::background();
        ctx.cancel();
        let err = manager.ensure(&ctx).unwrap_err();
        assert!(matches!(err, Error::CertificateAuthority(_)));
    }

    #[test]
    fn test_random_serial_fits_twenty_bytes_positive() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..32 {
            let serial = random_serial(&mut rng);
            let bytes = serial.to_bytes();
            assert_eq!(bytes.len(), 20);
            assert_eq!(bytes[0] & 0x80, 0);
        }
    }
}
