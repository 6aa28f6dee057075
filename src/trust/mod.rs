// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! OS trust-store installation of the CA certificate.
//!
//! Every backend compiles on every platform; the factory selects one at
//! runtime by platform key so any backend stays testable anywhere.

mod linux;
mod macos;
mod windows;

pub use linux::LinuxTrustStore;
pub use macos::MacOsTrustStore;
pub use windows::WindowsTrustStore;

use crate::config::TrustConfig;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::runner::CommandRunner;
use std::path::Path;

/// Installs and removes the CA certificate in one platform trust store.
pub trait TrustStore {
    fn install(&self, ctx: &Context, certificate_path: &Path) -> Result<()>;
    fn uninstall(&self, ctx: &Context) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Build the trust store for the running operating system.
pub fn new_trust_store<R, F>(
    runner: R,
    filesystem: F,
    config: TrustConfig,
) -> Result<Box<dyn TrustStore>>
where
    R: CommandRunner + 'static,
    F: FileSystem + 'static,
{
    for_platform(std::env::consts::OS, runner, filesystem, config)
}

pub(crate) fn for_platform<R, F>(
    os: &str,
    runner: R,
    filesystem: F,
    config: TrustConfig,
) -> Result<Box<dyn TrustStore>>
where
    R: CommandRunner + 'static,
    F: FileSystem + 'static,
{
    match os {
        "macos" => Ok(Box::new(MacOsTrustStore::new(runner, config))),
        "linux" => Ok(Box::new(LinuxTrustStore::new(runner, filesystem, config))),
        "windows" => Ok(Box::new(WindowsTrustStore::new(runner, config))),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}
