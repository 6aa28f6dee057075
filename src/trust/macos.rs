// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

use crate::config::TrustConfig;
use crate::ctx::Context;
use crate::error::Result;
use crate::fs::path_to_str;
use crate::runner::CommandRunner;
use crate::trust::TrustStore;
use std::path::Path;
use tracing::info;

/// macOS system keychain, driven by `security`. Both operations need
/// administrator rights.
pub struct MacOsTrustStore<R> {
    runner: R,
    config: TrustConfig,
}

impl<R: CommandRunner> MacOsTrustStore<R> {
    pub fn new(runner: R, config: TrustConfig) -> Self {
        Self { runner, config }
    }
}

impl<R: CommandRunner> TrustStore for MacOsTrustStore<R> {
    fn install(&self, ctx: &Context, certificate_path: &Path) -> Result<()> {
        let certificate = path_to_str(certificate_path)?;
        let keychain = path_to_str(&self.config.macos_keychain)?;

        info!(keychain, "installing CA into the system keychain");
        self.runner.run_privileged(
            ctx,
            "security",
            &[
                "add-trusted-cert",
                "-d",
                "-r",
                "trustRoot",
                "-k",
                keychain,
                certificate,
            ],
        )
    }

    fn uninstall(&self, ctx: &Context) -> Result<()> {
        let keychain = path_to_str(&self.config.macos_keychain)?;

        info!(keychain, "removing CA from the system keychain");
        self.runner.run_privileged(
            ctx,
            "security",
            &[
                "delete-certificate",
                "-c",
                &self.config.ca_common_name,
                keychain,
            ],
        )
    }

    fn name(&self) -> &'static str {
        "macOS system keychain"
    }
}
