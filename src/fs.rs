// Copyright 2025 devca contributors
// SPDX-License-Identifier: Apache-2.0

//! Filesystem abstraction with explicit permission bits.

use crate::error::{Error, Result};
use std::path::Path;

pub fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))
}

/// Models the file operations the certificate lifecycle needs: directory
/// creation, reads, permission-bearing writes, removal, and existence checks.
pub trait FileSystem {
    fn ensure_dir(&self, path: &Path, mode: u32) -> Result<()>;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;
    /// Removing a path that does not exist is not an error.
    fn remove(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// The local operating system's filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    #[cfg(unix)]
    fn ensure_dir(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .map_err(|e| Error::CreateDir {
                path: path.to_path_buf(),
                source: e,
            })
    }

    #[cfg(not(unix))]
    fn ensure_dir(&self, path: &Path, _mode: u32) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| Error::CreateDir {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    #[cfg(unix)]
    fn write(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        use std::fs::OpenOptions;
        use std::io::Write;
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)
            .map_err(|e| Error::WriteFile {
                path: path.to_path_buf(),
                source: e,
            })?;

        file.write_all(data).map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        // mode() only applies at creation; enforce it on overwrite too.
        let permissions = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(path, permissions).map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    #[cfg(not(unix))]
    fn write(&self, path: &Path, data: &[u8], _mode: u32) -> Result<()> {
        std::fs::write(path, data).map_err(|e| Error::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Remove {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
