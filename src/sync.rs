// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository sync logic.
//!
//! Utilities to materialize the patch files of one sync job into a scratch
//! checkout. The clone is shallow (history depth 1), single-branch, and
//! leaves the working tree empty; each requested file is then restored from
//! the branch tip individually, in caller-supplied order. The scratch tree
//! lives exactly as long as one job, and gets reclaimed whether the job
//! succeeded or not.
//!
//! # Git As A Collaborator
//!
//! Git is treated strictly as a command-line collaborator: we hand it
//! arguments and a working directory, and we inspect its exit status. A
//! non-zero exit from clone or checkout is a hard failure that aborts the
//! job — proceeding with a missing file would silently publish a stale or
//! empty artifact, which is worse than publishing nothing.

use crate::path::{remove_dir_tree, PathError};

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, warn};

/// Source of repository checkouts.
///
/// Layer of indirection so the driver can be exercised against doubles, and
/// so an in-process git engine could slot in later without touching callers.
pub trait RepoSource {
    /// Materialize the requested files of one branch into a scratch checkout.
    fn sync(&self, url: &str, branch: &str, sources: &[PathBuf]) -> Result<Checkout>;
}

/// Repository sync through the external git binary.
#[derive(Debug, Default)]
pub struct GitCli;

impl RepoSource for GitCli {
    /// Shallow-clone one branch without a working tree, then restore each
    /// requested path from the branch tip.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Scratch`] if no scratch directory can be made.
    /// - Return [`SyncError::Clone`] if the clone invocation fails.
    /// - Return [`SyncError::Restore`] if any per-path checkout fails.
    fn sync(&self, url: &str, branch: &str, sources: &[PathBuf]) -> Result<Checkout> {
        let scratch = tempfile::Builder::new()
            .prefix("patchpub-deploy-")
            .tempdir()
            .map_err(|err| SyncError::Scratch { source: err })?
            .keep();

        // INVARIANT: Construct the handle first, so a failed clone or
        // restore still reclaims the scratch tree on drop.
        let checkout = Checkout::new(scratch);

        info!(
            "cloning [{url}] (branch {branch}) into {:?}",
            checkout.root().display()
        );
        gitcall(
            None,
            [
                OsString::from("clone"),
                "-n".into(),
                "--depth=1".into(),
                format!("--branch={branch}").into(),
                url.into(),
                checkout.root().into(),
            ],
        )
        .map_err(|err| SyncError::Clone {
            source: err,
            url: url.into(),
            branch: branch.into(),
        })?;

        for source in sources {
            debug!("restoring {:?} from branch tip", source.display());
            gitcall(
                Some(checkout.root()),
                [
                    OsString::from("checkout"),
                    "HEAD".into(),
                    "--".into(),
                    source.clone().into(),
                ],
            )
            .map_err(|err| SyncError::Restore {
                source: err,
                path: source.clone(),
            })?;
        }

        Ok(checkout)
    }
}

/// Scratch checkout produced by one sync job.
///
/// Owns the directory tree exclusively. Read what you need out of it, then
/// call [`Checkout::close`] to reclaim it with error propagation; dropping
/// the handle reclaims it best-effort instead.
#[derive(Debug)]
pub struct Checkout {
    root: PathBuf,
}

impl Checkout {
    /// Take exclusive ownership of an existing scratch tree.
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root of the checked-out tree.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Reclaim the scratch tree now, surfacing any removal failure.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Cleanup`] if removal fails even after the
    ///   forced retry.
    pub fn close(self) -> Result<()> {
        remove_dir_tree(&self.root)?;
        Ok(())
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        // INVARIANT: close() already removed the tree; nothing left to do.
        if !self.root.exists() {
            return;
        }

        if let Err(error) = remove_dir_tree(&self.root) {
            warn!("leaked scratch checkout: {error}");
        }
    }
}

fn gitcall(
    cwd: Option<&Path>,
    args: impl IntoIterator<Item = impl Into<OsString>>,
) -> io::Result<String> {
    let mut command = Command::new("git");
    command.args(args.into_iter().map(Into::into));
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = command.output()?;
    let mut message = String::new();
    for stream in [output.stdout.as_slice(), output.stderr.as_slice()] {
        if !stream.is_empty() {
            message.push_str(String::from_utf8_lossy(stream).trim_end());
            message.push('\n');
        }
    }

    if !output.status.success() {
        return Err(io::Error::other(format!(
            "git exited with {}:\n{message}",
            output.status
        )));
    }

    Ok(message)
}

/// Repository sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Scratch checkout directory cannot be allocated.
    #[error("failed to allocate scratch checkout directory")]
    Scratch {
        #[source]
        source: io::Error,
    },

    /// Shallow clone of the requested branch failed.
    #[error("failed to clone branch {branch:?} of [{url}]")]
    Clone {
        #[source]
        source: io::Error,
        url: String,
        branch: String,
    },

    /// Restoring a requested path from the branch tip failed.
    #[error("failed to restore {:?} from branch tip", path.display())]
    Restore {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Scratch checkout cannot be reclaimed.
    #[error(transparent)]
    Cleanup(#[from] PathError),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_failure_is_a_hard_error() {
        let result = GitCli.sync(
            "/this/repository/does/not/exist",
            "master",
            &[PathBuf::from("0.utf")],
        );

        assert!(matches!(result, Err(SyncError::Clone { .. })));
    }

    #[test]
    fn close_reclaims_the_scratch_tree() -> anyhow::Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("patchpub-deploy-")
            .tempdir()?
            .keep();
        std::fs::write(scratch.join("0.utf"), "script")?;

        let checkout = Checkout {
            root: scratch.clone(),
        };
        assert!(checkout.root().join("0.utf").is_file());

        checkout.close()?;
        assert!(!scratch.exists());

        Ok(())
    }
}
