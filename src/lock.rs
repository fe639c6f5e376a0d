// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Single-instance run guard.
//!
//! Two deployments racing on the same web root would trade artifacts back
//! and forth, so a run first takes a non-blocking exclusive advisory lock on
//! a well-known file. The lock is cooperative: it only keeps out other
//! patchpub processes that also attempt it, which is the only contention the
//! destination web root actually sees.
//!
//! There is no explicit release. The handle is held for the remaining
//! process lifetime and the OS drops the lock at exit, which also covers
//! runs that get killed mid-flight.

use fs2::FileExt;
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::info;

/// Process-wide mutual exclusion marker backed by a lock file.
///
/// Keep the value alive for as long as the guarantee is needed; dropping it
/// (or exiting) releases the underlying advisory lock.
#[derive(Debug)]
pub struct InstanceLock {
    _file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the instance lock, failing fast on contention.
    ///
    /// Opens (creating if absent) the file at the well-known path and takes
    /// a non-blocking exclusive advisory lock on it.
    ///
    /// # Errors
    ///
    /// - Return [`LockError::Open`] if the lock file cannot be opened.
    /// - Return [`LockError::AlreadyRunning`] if another live process holds
    ///   the lock. Fatal by policy: the whole run must abort before any sync
    ///   job executes.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|err| LockError::Open {
                source: err,
                path: path.to_path_buf(),
            })?;

        file.try_lock_exclusive().map_err(|err| {
            if err.kind() == fs2::lock_contended_error().kind() {
                LockError::AlreadyRunning {
                    path: path.to_path_buf(),
                }
            } else {
                LockError::Open {
                    source: err,
                    path: path.to_path_buf(),
                }
            }
        })?;

        info!("obtained instance lock at {:?}", path.display());

        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file backing this guard.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

/// Instance lock error types.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Lock file cannot be opened or created.
    #[error("failed to open lock file at {:?}", path.display())]
    Open {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Another deployment already holds the lock.
    #[error("another deployment is already running (lock held at {:?})", path.display())]
    AlreadyRunning { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = LockError> = std::result::Result<T, E>;
