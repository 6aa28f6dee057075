// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse certificate: {0}")]
    CertParse(String),

    #[error("Failed to parse private key: {0}")]
    KeyParse(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Certificate generation failed: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("No hosts specified")]
    NoHosts,

    #[error("Invalid path (non-UTF8): {0}")]
    InvalidPath(PathBuf),

    #[error("Command failed: {command}\n{stderr}")]
    Command { command: String, stderr: String },

    #[error("Command '{command}' timed out after {seconds} seconds")]
    CommandTimeout { command: String, seconds: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Privileged execution not supported on {0}")]
    PrivilegedExecutionUnsupported(String),

    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("Trust store operation failed: {0}")]
    TrustStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Certificate authority: {0}")]
    CertificateAuthority(#[source] Box<Error>),

    #[error("Server certificate: {0}")]
    ServerCertificate(#[source] Box<Error>),

    #[error("Cleanup failed: {}", join_failures(.0))]
    Cleanup(Vec<Error>),
}

impl Error {
    /// Wrap an error as a certificate-authority operation failure.
    pub fn certificate_authority(error: Error) -> Error {
        Error::CertificateAuthority(Box::new(error))
    }

    /// Wrap an error as a server-certificate operation failure.
    pub fn server_certificate(error: Error) -> Error {
        Error::ServerCertificate(Box::new(error))
    }
}

fn join_failures(failures: &[Error]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_joins_all_failures() {
        let error = Error::Cleanup(vec![
            Error::Remove {
                path: PathBuf::from("/a"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
            Error::Remove {
                path: PathBuf::from("/b"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
        ]);

        let rendered = error.to_string();
        assert!(rendered.contains("/a"));
        assert!(rendered.contains("/b"));
        assert!(rendered.contains("; "));
    }

    #[test]
    fn test_operation_wrappers_preserve_source() {
        let wrapped = Error::certificate_authority(Error::NoHosts);
        assert!(matches!(wrapped, Error::CertificateAuthority(_)));
        assert!(wrapped.to_string().contains("No hosts specified"));
    }
}
