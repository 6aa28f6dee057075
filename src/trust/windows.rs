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

/// Windows certificate store, driven by `certutil`. Elevation is the
/// caller's responsibility, so both operations go through the unprivileged
/// path.
pub struct WindowsTrustStore<R> {
    runner: R,
    config: TrustConfig,
}

impl<R: CommandRunner> WindowsTrustStore<R> {
    pub fn new(runner: R, config: TrustConfig) -> Self {
        Self { runner, config }
    }
}

impl<R: CommandRunner> TrustStore for WindowsTrustStore<R> {
    fn install(&self, ctx: &Context, certificate_path: &Path) -> Result<()> {
        let certificate = path_to_str(certificate_path)?;

        info!(store = %self.config.windows_store, "installing CA into the certificate store");
        self.runner.run(
            ctx,
            "certutil",
            &["-addstore", "-f", &self.config.windows_store, certificate],
        )
    }

    fn uninstall(&self, ctx: &Context) -> Result<()> {
        info!(store = %self.config.windows_store, "removing CA from the certificate store");
        self.runner.run(
            ctx,
            "certutil",
            &[
                "-delstore",
                &self.config.windows_store,
                &self.config.ca_common_name,
            ],
        )
    }

    fn name(&self) -> &'static str {
        "Windows certificate store"
    }
}
