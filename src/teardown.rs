// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Uninstall: best-effort removal of everything that was set up, reporting
//! every failure rather than stopping at the first.

use crate::ctx::Context;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::trust::TrustStore;
use std::path::PathBuf;
use tracing::info;

/// Remove every listed file. Missing files are fine; each real failure is
/// collected and they are reported together.
pub fn remove_material<F: FileSystem>(filesystem: &F, paths: &[PathBuf]) -> Result<()> {
    let mut failures = Vec::new();
    for path in paths {
        if let Err(error) = filesystem.remove(path) {
            failures.push(error);
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Cleanup(failures))
    }
}

/// Full teardown: withdraw trust (when a store is given), then remove the
/// certificate material. Both steps always run; failures aggregate.
pub fn uninstall<F: FileSystem>(
    ctx: &Context,
    trust_store: Option<&dyn TrustStore>,
    filesystem: &F,
    paths: &[PathBuf],
) -> Result<()> {
    let mut failures = Vec::new();

    if let Some(store) = trust_store {
        info!(store = store.name(), "withdrawing trust");
        if let Err(error) = store.uninstall(ctx) {
            failures.push(error);
        }
    }

    for path in paths {
        if let Err(error) = filesystem.remove(path) {
            failures.push(error);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::Cleanup(failures))
    }
}
