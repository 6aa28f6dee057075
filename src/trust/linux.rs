// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

use crate::config::TrustConfig;
use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::fs::{path_to_str, FileSystem};
use crate::runner::CommandRunner;
use crate::trust::TrustStore;
use std::path::Path;
use tracing::{debug, info};

/// Linux CA anchors: copy the certificate to the distribution's anchor
/// directory, then refresh the bundle. Debian-style
/// `update-ca-certificates` is tried first, p11-kit's `trust anchor` is the
/// fallback.
pub struct LinuxTrustStore<R, F> {
    runner: R,
    filesystem: F,
    config: TrustConfig,
}

impl<R: CommandRunner, F: FileSystem> LinuxTrustStore<R, F> {
    pub fn new(runner: R, filesystem: F, config: TrustConfig) -> Self {
        Self {
            runner,
            filesystem,
            config,
        }
    }

    fn refresh(&self, ctx: &Context, removing: bool) -> Result<()> {
        let first = match self.runner.run_privileged(ctx, "update-ca-certificates", &[]) {
            Ok(()) => return Ok(()),
            Err(error) => error,
        };
        debug!(%first, "update-ca-certificates failed, trying p11-kit trust");

        let anchor = path_to_str(&self.config.linux_anchor_path)?;
        let arguments: Vec<&str> = if removing {
            vec!["anchor", "--remove", anchor]
        } else {
            vec!["anchor", anchor]
        };
        match self.runner.run_privileged(ctx, "trust", &arguments) {
            Ok(()) => Ok(()),
            Err(second) => Err(Error::TrustStore(format!(
                "update-ca-certificates failed: {first}; trust anchor failed: {second}"
            ))),
        }
    }
}

impl<R: CommandRunner, F: FileSystem> TrustStore for LinuxTrustStore<R, F> {
    fn install(&self, ctx: &Context, certificate_path: &Path) -> Result<()> {
        let certificate = self.filesystem.read(certificate_path)?;

        info!(anchor = %self.config.linux_anchor_path.display(), "installing CA anchor");
        self.filesystem.write(
            &self.config.linux_anchor_path,
            &certificate,
            self.config.linux_anchor_mode,
        )?;
        self.refresh(ctx, false)
    }

    fn uninstall(&self, ctx: &Context) -> Result<()> {
        info!(anchor = %self.config.linux_anchor_path.display(), "removing CA anchor");
        self.filesystem.remove(&self.config.linux_anchor_path)?;
        self.refresh(ctx, true)
    }

    fn name(&self) -> &'static str {
        "Linux CA anchors"
    }
}
