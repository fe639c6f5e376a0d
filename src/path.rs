// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevant path information for external files that need to be
//! interacted with, or managed in some way. Also houses the forced directory
//! tree removal fallback that scratch checkout cleanup relies on.

use std::{
    env::temp_dir,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Default web root that published artifacts land under.
pub const DEFAULT_WEB_ROOT: &str = "/home/07th-mod/web";

/// Well-known lock file name for the single-instance guard.
const LOCK_FILE_NAME: &str = "patchpub-instance.lock";

/// Determine absolute path to the default instance lock file.
///
/// Lives in the platform temporary directory so that stale locks from a
/// killed run are reclaimed through OS advisory lock semantics, not by us.
pub fn default_lock_path() -> PathBuf {
    temp_dir().join(LOCK_FILE_NAME)
}

/// Resolve the web root argument into a usable path.
///
/// Performs shell expansion on the caller-supplied path, falling back to
/// [`DEFAULT_WEB_ROOT`] when no argument was given. Does not check if the
/// path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::Expand`] if shell expansion fails.
pub fn resolve_web_root(arg: Option<&str>) -> Result<PathBuf> {
    let raw = arg.unwrap_or(DEFAULT_WEB_ROOT);
    let expanded = shellexpand::full(raw).map_err(PathError::Expand)?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Remove a directory tree, retrying once in forced mode.
///
/// Some platforms transiently refuse to delete a directory that an external
/// process just finished using. On the first failure every entry in the tree
/// has its read-only attribute cleared, then removal is attempted one more
/// time before the error is surfaced.
///
/// # Errors
///
/// - Return [`PathError::RemoveTree`] if the forced retry also fails.
pub fn remove_dir_tree(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(error) => {
            warn!(
                "removal of {:?} failed ({error}), retrying in forced mode",
                path.display()
            );
            clear_readonly(path).ok();
            fs::remove_dir_all(path).map_err(|err| PathError::RemoveTree {
                source: err,
                path: path.to_path_buf(),
            })
        }
    }
}

fn clear_readonly(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }

    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            clear_readonly(&entry?.path())?;
        }
    }

    Ok(())
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Shell expansion of a caller-supplied path failed.
    #[error(transparent)]
    Expand(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Directory tree removal failed even in forced mode.
    #[error("failed to remove directory tree at {:?}", path.display())]
    RemoveTree {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
