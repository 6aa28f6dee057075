// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle configuration: compiled-in defaults, per-component config
//! structs, and the optional `config.toml` overlay.

use crate::error::{Error, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Duration;

pub const CA_CERTIFICATE_FILE_NAME: &str = "ca.pem";
pub const CA_KEY_FILE_NAME: &str = "ca.key";
pub const LEAF_CERTIFICATE_FILE_NAME: &str = "localhost.pem";
pub const LEAF_KEY_FILE_NAME: &str = "localhost.key";

pub const CA_COMMON_NAME: &str = "devca Development CA";
pub const CA_ORGANIZATION: &str = "devca";
pub const CA_ORGANIZATIONAL_UNIT: &str = "Development";

pub const DEFAULT_CA_KEY_BITS: usize = 4096;
pub const DEFAULT_LEAF_KEY_BITS: usize = 2048;
pub const DEFAULT_CA_VALIDITY_DAYS: u32 = 1825;
pub const DEFAULT_CA_RENEWAL_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_LEAF_VALIDITY_DAYS: u32 = 30;
pub const DEFAULT_LEAF_RENEWAL_WINDOW_HOURS: u32 = 72;

pub const DEFAULT_DIRECTORY_MODE: u32 = 0o700;
pub const DEFAULT_FILE_MODE: u32 = 0o600;

pub const MACOS_SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";
pub const WINDOWS_ROOT_STORE: &str = "Root";
pub const LINUX_TRUST_ANCHOR_PATH: &str =
    "/usr/local/share/ca-certificates/devca-development-ca.crt";
pub const LINUX_TRUST_ANCHOR_MODE: u32 = 0o644;

const MAX_VALIDITY_DAYS: u32 = 3650;
const MIN_KEY_BITS: usize = 2048;

/// Settings for the certificate authority. Immutable once a manager holds it.
#[derive(Debug, Clone)]
pub struct CaConfig {
    pub directory: PathBuf,
    pub certificate_file: String,
    pub key_file: String,
    pub directory_mode: u32,
    pub certificate_mode: u32,
    pub key_mode: u32,
    pub key_bits: usize,
    pub validity: Duration,
    pub renewal_window: Duration,
    pub common_name: String,
    pub organization: String,
    pub organizational_unit: String,
}

impl CaConfig {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            certificate_file: CA_CERTIFICATE_FILE_NAME.to_string(),
            key_file: CA_KEY_FILE_NAME.to_string(),
            directory_mode: DEFAULT_DIRECTORY_MODE,
            certificate_mode: DEFAULT_FILE_MODE,
            key_mode: DEFAULT_FILE_MODE,
            key_bits: DEFAULT_CA_KEY_BITS,
            validity: Duration::days(i64::from(DEFAULT_CA_VALIDITY_DAYS)),
            renewal_window: Duration::days(i64::from(DEFAULT_CA_RENEWAL_WINDOW_DAYS)),
            common_name: CA_COMMON_NAME.to_string(),
            organization: CA_ORGANIZATION.to_string(),
            organizational_unit: CA_ORGANIZATIONAL_UNIT.to_string(),
        }
    }

    pub fn certificate_path(&self) -> PathBuf {
        self.directory.join(&self.certificate_file)
    }

    pub fn key_path(&self) -> PathBuf {
        self.directory.join(&self.key_file)
    }
}

/// Settings for leaf server certificates.
#[derive(Debug, Clone)]
pub struct LeafConfig {
    pub key_bits: usize,
    pub validity: Duration,
    pub renewal_window: Duration,
    pub certificate_mode: u32,
    pub key_mode: u32,
}

impl Default for LeafConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_LEAF_KEY_BITS,
            validity: Duration::days(i64::from(DEFAULT_LEAF_VALIDITY_DAYS)),
            renewal_window: Duration::hours(i64::from(DEFAULT_LEAF_RENEWAL_WINDOW_HOURS)),
            certificate_mode: DEFAULT_FILE_MODE,
            key_mode: DEFAULT_FILE_MODE,
        }
    }
}

/// One issuance request: the hosts the certificate must cover and where the
/// pair is persisted. `hosts` is treated as a set.
#[derive(Debug, Clone)]
pub struct LeafRequest {
    pub hosts: Vec<String>,
    pub certificate_path: PathBuf,
    pub key_path: PathBuf,
}

/// Platform trust-store settings. The common name is the removal key on
/// macOS and Windows; Linux removes by destination path.
#[derive(Debug, Clone)]
pub struct TrustConfig {
    pub ca_common_name: String,
    pub macos_keychain: PathBuf,
    pub windows_store: String,
    pub linux_anchor_path: PathBuf,
    pub linux_anchor_mode: u32,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            ca_common_name: CA_COMMON_NAME.to_string(),
            macos_keychain: PathBuf::from(MACOS_SYSTEM_KEYCHAIN),
            windows_store: WINDOWS_ROOT_STORE.to_string(),
            linux_anchor_path: PathBuf::from(LINUX_TRUST_ANCHOR_PATH),
            linux_anchor_mode: LINUX_TRUST_ANCHOR_MODE,
        }
    }
}

/// User-editable overrides, loaded from `config.toml` when present.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_ca_validity_days")]
    pub ca_validity_days: u32,
    #[serde(default = "default_ca_renewal_days")]
    pub ca_renewal_days: u32,
    #[serde(default = "default_ca_key_bits")]
    pub ca_key_bits: usize,
    #[serde(default = "default_leaf_validity_days")]
    pub leaf_validity_days: u32,
    #[serde(default = "default_leaf_renewal_hours")]
    pub leaf_renewal_hours: u32,
    #[serde(default = "default_leaf_key_bits")]
    pub leaf_key_bits: usize,
}

fn default_ca_validity_days() -> u32 {
    DEFAULT_CA_VALIDITY_DAYS
}

fn default_ca_renewal_days() -> u32 {
    DEFAULT_CA_RENEWAL_WINDOW_DAYS
}

fn default_ca_key_bits() -> usize {
    DEFAULT_CA_KEY_BITS
}

fn default_leaf_validity_days() -> u32 {
    DEFAULT_LEAF_VALIDITY_DAYS
}

fn default_leaf_renewal_hours() -> u32 {
    DEFAULT_LEAF_RENEWAL_WINDOW_HOURS
}

fn default_leaf_key_bits() -> usize {
    DEFAULT_LEAF_KEY_BITS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ca_validity_days: default_ca_validity_days(),
            ca_renewal_days: default_ca_renewal_days(),
            ca_key_bits: default_ca_key_bits(),
            leaf_validity_days: default_leaf_validity_days(),
            leaf_renewal_hours: default_leaf_renewal_hours(),
            leaf_key_bits: default_leaf_key_bits(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.ca_validity_days == 0 || self.ca_validity_days > MAX_VALIDITY_DAYS {
            return Err(Error::Config(format!(
                "ca_validity_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }
        if self.leaf_validity_days == 0 || self.leaf_validity_days > MAX_VALIDITY_DAYS {
            return Err(Error::Config(format!(
                "leaf_validity_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }
        if self.ca_renewal_days >= self.ca_validity_days {
            return Err(Error::Config(
                "ca_renewal_days must be shorter than ca_validity_days".into(),
            ));
        }
        if self.leaf_renewal_hours >= self.leaf_validity_days * 24 {
            return Err(Error::Config(
                "leaf_renewal_hours must be shorter than the leaf validity".into(),
            ));
        }
        if self.ca_key_bits < MIN_KEY_BITS || self.leaf_key_bits < MIN_KEY_BITS {
            return Err(Error::Config(format!(
                "key sizes below {MIN_KEY_BITS} bits are not accepted"
            )));
        }
        Ok(())
    }

    pub fn ca_config(&self, directory: PathBuf) -> CaConfig {
        let mut ca = CaConfig::new(directory);
        ca.key_bits = self.ca_key_bits;
        ca.validity = Duration::days(i64::from(self.ca_validity_days));
        ca.renewal_window = Duration::days(i64::from(self.ca_renewal_days));
        ca
    }

    pub fn leaf_config(&self) -> LeafConfig {
        LeafConfig {
            key_bits: self.leaf_key_bits,
            validity: Duration::days(i64::from(self.leaf_validity_days)),
            renewal_window: Duration::hours(i64::from(self.leaf_renewal_hours)),
            ..LeafConfig::default()
        }
    }
}

/// Resolved locations of every file the tool manages.
#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
    pub ca_certificate: PathBuf,
    pub ca_key: PathBuf,
    pub leaf_certificate: PathBuf,
    pub leaf_key: PathBuf,
    pub config: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        Ok(Self::from_base(Self::base_dir()?))
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            ca_certificate: base.join(CA_CERTIFICATE_FILE_NAME),
            ca_key: base.join(CA_KEY_FILE_NAME),
            leaf_certificate: base.join(LEAF_CERTIFICATE_FILE_NAME),
            leaf_key: base.join(LEAF_KEY_FILE_NAME),
            config: base.join("config.toml"),
            base,
        }
    }

    fn base_dir() -> Result<PathBuf> {
        if let Ok(custom_root) = std::env::var("DEVCA_ROOT") {
            let path = PathBuf::from(&custom_root);
            if !path.is_absolute() {
                return Err(Error::Config(format!(
                    "DEVCA_ROOT must be an absolute path, got: {custom_root}"
                )));
            }
            return Ok(path);
        }

        if let Some(project_dirs) = ProjectDirs::from("", "", "devca") {
            Ok(project_dirs.data_dir().to_path_buf())
        } else if let Some(base_dirs) = BaseDirs::new() {
            Ok(base_dirs.home_dir().join(".devca"))
        } else {
            Err(Error::Config(
                "could not determine a data directory; set DEVCA_ROOT".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.ca_validity_days, 1825);
        assert_eq!(config.ca_renewal_days, 30);
        assert_eq!(config.leaf_validity_days, 30);
        assert_eq!(config.leaf_renewal_hours, 72);
        assert_eq!(config.ca_key_bits, 4096);
        assert_eq!(config.leaf_key_bits, 2048);
    }

    #[test]
    fn test_config_load_missing_file_uses_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.ca_validity_days, DEFAULT_CA_VALIDITY_DAYS);
    }

    #[test]
    fn test_config_load_partial_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "leaf_validity_days = 7").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.leaf_validity_days, 7);
        assert_eq!(config.ca_validity_days, DEFAULT_CA_VALIDITY_DAYS);
    }

    #[test]
    fn test_config_rejects_renewal_longer_than_validity() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ca_validity_days = 10").unwrap();
        writeln!(file, "ca_renewal_days = 10").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_rejects_small_keys() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "leaf_key_bits = 1024").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let config = Config {
            ca_validity_days: 90,
            ..Config::default()
        };

        config.save(file.path()).unwrap();
        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.ca_validity_days, 90);
    }

    #[test]
    fn test_paths_from_base() {
        let paths = Paths::from_base(PathBuf::from("/data/devca"));
        assert_eq!(paths.ca_certificate, PathBuf::from("/data/devca/ca.pem"));
        assert_eq!(paths.ca_key, PathBuf::from("/data/devca/ca.key"));
        assert_eq!(
            paths.leaf_certificate,
            PathBuf::from("/data/devca/localhost.pem")
        );
        assert_eq!(paths.leaf_key, PathBuf::from("/data/devca/localhost.key"));
    }

    #[test]
    fn test_ca_config_paths() {
        let ca = CaConfig::new(PathBuf::from("/data/devca"));
        assert_eq!(ca.certificate_path(), PathBuf::from("/data/devca/ca.pem"));
        assert_eq!(ca.key_path(), PathBuf::from("/data/devca/ca.key"));
    }
}
