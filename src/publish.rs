// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Artifact publishing logic.
//!
//! Move checked-out patch files into their web-accessible destination paths.
//! For each file spec the publisher applies the optional rename in place,
//! optionally compresses the file into a single-entry archive, deletes any
//! pre-existing destination file, creates missing destination directories,
//! and moves the artifact into place.
//!
//! Replacement is destructive and not transactional: a crash between the
//! delete and the move leaves the destination path absent until the next
//! successful run. The single-instance lock keeps concurrent runs from
//! widening that window.

pub mod archive;

use crate::{
    config::FileSpec,
    publish::archive::{Archive, ArchiveError, SevenZip},
};

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::info;

/// Publish checked-out files into the destination web root.
#[derive(Debug, Default)]
pub struct Publisher<A = SevenZip>
where
    A: Archive,
{
    archiver: A,
}

impl<A> Publisher<A>
where
    A: Archive,
{
    /// Construct new publisher around an archiver strategy.
    pub fn new(archiver: A) -> Self {
        Self { archiver }
    }

    /// Publish every file spec of one sync job.
    ///
    /// Each destination path receives exactly one artifact. A pre-existing
    /// file at the destination is removed first, never merged with.
    ///
    /// # Errors
    ///
    /// - Return [`PublishError::MissingSource`] if a requested file never
    ///   made it into the checkout.
    /// - Return [`PublishError::Rename`] if the in-place rename fails.
    /// - Return [`PublishError::Archive`] if the archiver strategy fails.
    /// - Return [`PublishError::Replace`] if the stale destination file
    ///   cannot be deleted.
    /// - Return [`PublishError::CreateDirs`] if destination directories
    ///   cannot be created.
    /// - Return [`PublishError::Move`] if the artifact cannot be moved into
    ///   place.
    pub fn publish(
        &self,
        checkout_root: &Path,
        files: &[FileSpec],
        web_root: &Path,
        compress: bool,
    ) -> Result<()> {
        for spec in files {
            let mut source = checkout_root.join(&spec.source);
            if !source.is_file() {
                return Err(PublishError::MissingSource { path: source });
            }

            if let Some(new_name) = &spec.rename {
                let renamed = source.with_file_name(new_name);
                fs::rename(&source, &renamed).map_err(|err| PublishError::Rename {
                    source: err,
                    from: source.clone(),
                    to: renamed.clone(),
                })?;
                source = renamed;
            }

            let artifact = if compress {
                let mut name = OsString::from(source.as_os_str());
                name.push(".");
                name.push(self.archiver.suffix());
                let archived = PathBuf::from(name);
                self.archiver.archive(&source, &archived)?;
                archived
            } else {
                source
            };

            let dest = web_root.join(&spec.dest);
            if dest.exists() {
                info!("deleting stale {:?}", dest.display());
                fs::remove_file(&dest).map_err(|err| PublishError::Replace {
                    source: err,
                    path: dest.clone(),
                })?;
            }

            if let Some(parent) = dest.parent() {
                mkdirp::mkdirp(parent).map_err(|err| PublishError::CreateDirs {
                    source: err,
                    path: parent.to_path_buf(),
                })?;
            }

            info!("moving {:?} -> {:?}", artifact.display(), dest.display());
            move_file(&artifact, &dest)?;
        }

        Ok(())
    }
}

// Destination web roots commonly sit on another filesystem than the scratch
// checkout, so a failed rename falls back to copy-then-remove.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)
        .and_then(|_| fs::remove_file(from))
        .map_err(|err| PublishError::Move {
            source: err,
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        })?;

    Ok(())
}

/// Publishing error types.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Requested file is absent from the checkout.
    #[error("no source file at {:?} inside checkout", path.display())]
    MissingSource { path: PathBuf },

    /// In-place rename of the source file failed.
    #[error("failed to rename {:?} -> {:?}", from.display(), to.display())]
    Rename {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Archiver strategy failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Stale destination file cannot be deleted.
    #[error("failed to delete stale artifact at {:?}", path.display())]
    Replace {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Destination directories cannot be created.
    #[error("failed to create destination directory {:?}", path.display())]
    CreateDirs {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Artifact cannot be moved into its destination path.
    #[error("failed to move {:?} -> {:?}", from.display(), to.display())]
    Move {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PublishError> = std::result::Result<T, E>;
