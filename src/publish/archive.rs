// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Archiver strategies.
//!
//! One sync job may ask for its files to be compressed before publishing.
//! Every strategy honors the same contract: single file in, single-file
//! archive out, with the archive member carrying the input file's base name.
//!
//! The default strategy shells out to 7-Zip the same way the rest of the
//! crate shells out to git. The in-process gzip strategy exists for
//! environments without an archiver binary on the PATH, and for tests.

use flate2::{Compression, GzBuilder};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::debug;

/// Produce a single-file compressed archive from a single input file.
pub trait Archive {
    /// Suffix appended to the input file name to name the archive.
    fn suffix(&self) -> &'static str;

    /// Compress `input` into a fresh archive at `output`.
    fn archive(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Archiving through the external 7-Zip binary.
#[derive(Debug, Default)]
pub struct SevenZip;

impl Archive for SevenZip {
    fn suffix(&self) -> &'static str {
        "zip"
    }

    /// Invoke `7z a <output> <input>`, inspecting the exit status.
    ///
    /// # Errors
    ///
    /// - Return [`ArchiveError::MissingArchiver`] if no 7z binary is on the
    ///   PATH.
    /// - Return [`ArchiveError::Invoke`] if the invocation fails or exits
    ///   non-zero.
    fn archive(&self, input: &Path, output: &Path) -> Result<()> {
        let program = which::which("7z")
            .map_err(|_| ArchiveError::MissingArchiver { program: "7z" })?;

        debug!("archiving {:?} -> {:?}", input.display(), output.display());
        let result = Command::new(program)
            .arg("a")
            .arg(output)
            .arg(input)
            .output()
            .map_err(|err| ArchiveError::Invoke {
                source: err,
                program: "7z",
            })?;

        if !result.status.success() {
            let message = String::from_utf8_lossy(&result.stderr).trim_end().to_owned();
            return Err(ArchiveError::Invoke {
                source: io::Error::other(format!(
                    "7z exited with {}:\n{message}",
                    result.status
                )),
                program: "7z",
            });
        }

        Ok(())
    }
}

/// In-process archiving into a single-member gzip stream.
///
/// The member name records the input file's base name, and the modification
/// time is left unset, so archiving the same bytes twice yields the same
/// artifact twice.
#[derive(Debug, Default)]
pub struct GzWriter;

impl Archive for GzWriter {
    fn suffix(&self) -> &'static str {
        "gz"
    }

    /// # Errors
    ///
    /// - Return [`ArchiveError::ReadInput`] if the input cannot be opened.
    /// - Return [`ArchiveError::WriteOutput`] if the archive cannot be
    ///   created or written.
    fn archive(&self, input: &Path, output: &Path) -> Result<()> {
        let member_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut reader = File::open(input).map_err(|err| ArchiveError::ReadInput {
            source: err,
            path: input.to_path_buf(),
        })?;
        let writer = File::create(output).map_err(|err| ArchiveError::WriteOutput {
            source: err,
            path: output.to_path_buf(),
        })?;

        debug!("archiving {:?} -> {:?}", input.display(), output.display());
        let mut encoder = GzBuilder::new()
            .filename(member_name.as_bytes())
            .write(writer, Compression::default());
        io::copy(&mut reader, &mut encoder).map_err(|err| ArchiveError::WriteOutput {
            source: err,
            path: output.to_path_buf(),
        })?;
        encoder.finish().map_err(|err| ArchiveError::WriteOutput {
            source: err,
            path: output.to_path_buf(),
        })?;

        Ok(())
    }
}

/// Archiver error types.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Archiver binary is not on the PATH.
    #[error("archiver binary {program:?} not found on PATH")]
    MissingArchiver { program: &'static str },

    /// Archiver invocation failed or exited non-zero.
    #[error("archiver {program:?} failed")]
    Invoke {
        #[source]
        source: io::Error,
        program: &'static str,
    },

    /// Input file cannot be read.
    #[error("failed to read archive input at {:?}", path.display())]
    ReadInput {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Archive cannot be created or written.
    #[error("failed to write archive at {:?}", path.display())]
    WriteOutput {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;
    use std::{fs, io::Read};

    #[test]
    fn gz_writer_records_member_name_and_contents() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("0.utf");
        let output = scratch.path().join("0.utf.gz");
        fs::write(&input, "full patch script")?;

        GzWriter.archive(&input, &output)?;

        let mut decoder = GzDecoder::new(File::open(&output)?);
        let member_name = decoder
            .header()
            .and_then(|header| header.filename())
            .map(|name| String::from_utf8_lossy(name).into_owned());
        assert_eq!(member_name.as_deref(), Some("0.utf"));

        let mut contents = String::new();
        decoder.read_to_string(&mut contents)?;
        assert_eq!(contents, "full patch script");

        Ok(())
    }

    #[test]
    fn gz_writer_is_deterministic() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("0.utf");
        fs::write(&input, "same bytes in, same bytes out")?;

        let first = scratch.path().join("first.gz");
        let second = scratch.path().join("second.gz");
        GzWriter.archive(&input, &first)?;
        GzWriter.archive(&input, &second)?;

        assert_eq!(fs::read(&first)?, fs::read(&second)?);

        Ok(())
    }

    #[test]
    fn seven_zip_produces_an_archive_when_available() -> anyhow::Result<()> {
        if which::which("7z").is_err() {
            return Ok(());
        }

        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("0.utf");
        let output = scratch.path().join("0.utf.zip");
        fs::write(&input, "voice only patch script")?;

        SevenZip.archive(&input, &output)?;
        assert!(output.is_file());
        assert!(fs::metadata(&output)?.len() > 0);

        Ok(())
    }
}
