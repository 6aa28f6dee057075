// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! devca issues and renews TLS credentials for local development and
//! propagates trust into the operating system's certificate store.
//!
//! The library is built around three lifecycle pieces:
//!
//! - [`CertificateAuthorityManager`] keeps a self-signed root CA on disk,
//!   reusing it until it nears expiry.
//! - [`ServerCertificateIssuer`] issues leaf certificates for a host set,
//!   signed by that CA, reusing them while the host set and validity hold.
//! - [`trust`] installs the CA into the platform trust store (macOS
//!   keychain, Windows certificate store, or Linux CA anchors).
//!
//! Time, randomness, the filesystem, and external commands are all injected
//! so every decision is deterministic under test.

pub mod ca;
pub mod clock;
pub mod config;
pub mod ctx;
pub mod error;
pub mod fs;
pub mod issuer;
pub mod runner;
pub mod teardown;
pub mod trust;
pub mod x509;

pub use ca::{CaMaterial, CertificateAuthorityManager};
pub use clock::{Clock, SystemClock};
pub use config::{CaConfig, Config, LeafConfig, LeafRequest, Paths, TrustConfig};
pub use ctx::Context;
pub use error::{Error, Result};
pub use fs::{FileSystem, OsFileSystem};
pub use issuer::{LeafMaterial, ServerCertificateIssuer};
pub use runner::{CommandRunner, OsCommandRunner};
pub use trust::{new_trust_store, TrustStore};
pub use x509::CertificateSummary;
