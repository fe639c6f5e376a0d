// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment target registry.
//!
//! Specify the layout of deployment targets that patchpub knows how to
//! publish. A __deployment target__ names a game whose patch files get
//! republished, and carries an ordered list of sync jobs. A __sync job__
//! fully describes one clone-checkout-publish cycle: the source repository,
//! the branch to take the files from, and the file specs to move into the
//! web root.
//!
//! # Registry Layout
//!
//! The registry ships built in with the two targets the operations side
//! cares about ("question" and "answer"). It can also be swapped out
//! wholesale through a TOML document of the same shape, mainly so tests and
//! staging runs can point jobs at scratch repositories:
//!
//! ```toml
//! [[target]]
//! name = "question"
//!
//! [[target.job]]
//! url = "https://github.com/07th-mod/umineko-question.git"
//! branch = "master"
//! compress = true
//! files = [{ source = "InDevelopment/ManualUpdates/0.utf", dest = "Beato/script-full.zip" }]
//! ```
//!
//! File I/O is left to the caller to figure out, except for the small
//! [`Registry::load`] convenience used by the CLI.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Fixed table of deployment targets.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Registry {
    /// Every deployment target this binary knows how to publish.
    #[serde(rename = "target")]
    pub targets: Vec<DeployTarget>,
}

impl Registry {
    /// Built-in registry covering the "question" and "answer" targets.
    pub fn builtin() -> Self {
        let question = DeployTarget {
            name: "question".into(),
            jobs: vec![
                SyncJob {
                    url: "https://github.com/07th-mod/umineko-question.git".into(),
                    branch: "master".into(),
                    compress: true,
                    files: vec![FileSpec {
                        source: "InDevelopment/ManualUpdates/0.utf".into(),
                        rename: None,
                        dest: "Beato/script-full.zip".into(),
                    }],
                },
                SyncJob {
                    url: "https://github.com/07th-mod/umineko-question.git".into(),
                    branch: "voice_only".into(),
                    compress: true,
                    files: vec![FileSpec {
                        source: "InDevelopment/ManualUpdates/0.utf".into(),
                        rename: Some("0.u".into()),
                        dest: "Beato/script-voice-only.zip".into(),
                    }],
                },
            ],
        };

        let answer = DeployTarget {
            name: "answer".into(),
            jobs: vec![
                SyncJob {
                    url: "https://github.com/07th-mod/umineko-answer.git".into(),
                    branch: "master".into(),
                    compress: true,
                    files: vec![
                        FileSpec {
                            source: "0.utf".into(),
                            rename: None,
                            dest: "Bern/script-full.zip".into(),
                        },
                        FileSpec {
                            source: "voices-only/0.utf".into(),
                            rename: None,
                            dest: "Bern/script-voice-only.zip".into(),
                        },
                    ],
                },
                SyncJob {
                    url: "https://github.com/07th-mod/umineko-answer.git".into(),
                    branch: "adv_mode".into(),
                    compress: true,
                    files: vec![FileSpec {
                        source: "0.utf".into(),
                        rename: None,
                        dest: "Bern/script-adv-mode.zip".into(),
                    }],
                },
            ],
        };

        Self {
            targets: vec![question, answer],
        }
    }

    /// Load a substitute registry from a TOML file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::ReadRegistry`] if the file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the document does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_to_string(path)
            .map_err(|err| ConfigError::ReadRegistry {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Look up a deployment target by name.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownTarget`] if no target carries the given
    ///   name. Fatal by policy: the caller must bail before any job runs.
    pub fn target(&self, name: impl AsRef<str>) -> Result<&DeployTarget> {
        let name = name.as_ref();
        self.targets
            .iter()
            .find(|target| target.name == name)
            .ok_or_else(|| ConfigError::UnknownTarget { name: name.into() })
    }
}

impl FromStr for Registry {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(ConfigError::Deserialize)
    }
}

impl Display for Registry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// A named deployment target with its ordered job list.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DeployTarget {
    /// Name the CLI selects this target by.
    pub name: String,

    /// Sync jobs executed sequentially, in listed order.
    #[serde(rename = "job")]
    pub jobs: Vec<SyncJob>,
}

/// One clone-checkout-publish cycle. Immutable once constructed.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncJob {
    /// Remote URL of the patch source repository.
    pub url: String,

    /// Branch whose tip the files are taken from.
    pub branch: String,

    /// Compress each file into a single-entry archive before publishing.
    #[serde(default)]
    pub compress: bool,

    /// Files to restore and publish, in listed order.
    pub files: Vec<FileSpec>,
}

/// A single file to carry from the checkout into the web root.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct FileSpec {
    /// Path of the file relative to the repository root.
    pub source: PathBuf,

    /// Optional new file name applied in place before compression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    /// Destination path relative to the web root.
    pub dest: PathBuf,
}

/// Registry error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Target name is not present in the registry.
    #[error("unknown deployment target {name:?}, expected \"question\" or \"answer\"")]
    UnknownTarget { name: String },

    /// Substitute registry file cannot be read.
    #[error("failed to read registry at {:?}", path.display())]
    ReadRegistry {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize registry document.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize registry document.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn deserialize_registry() -> anyhow::Result<()> {
        let result: Registry = indoc! {r#"
            [[target]]
            name = "question"

            [[target.job]]
            url = "https://blah.org/foo.git"
            branch = "master"
            compress = true
            files = [{ source = "0.utf", rename = "0.u", dest = "Beato/script.zip" }]
        "#}
        .parse()?;

        let expect = Registry {
            targets: vec![DeployTarget {
                name: "question".into(),
                jobs: vec![SyncJob {
                    url: "https://blah.org/foo.git".into(),
                    branch: "master".into(),
                    compress: true,
                    files: vec![FileSpec {
                        source: "0.utf".into(),
                        rename: Some("0.u".into()),
                        dest: "Beato/script.zip".into(),
                    }],
                }],
            }],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn registry_round_trips_through_toml() -> anyhow::Result<()> {
        let registry = Registry::builtin();
        let reparsed: Registry = registry.to_string().parse()?;
        assert_eq!(reparsed, registry);

        Ok(())
    }

    #[test_case("question", 2; "question runs two jobs")]
    #[test_case("answer", 2; "answer runs two jobs")]
    #[test]
    fn builtin_target_job_counts(name: &str, jobs: usize) {
        let registry = Registry::builtin();
        let target = registry.target(name).unwrap();
        pretty_assertions::assert_eq!(target.jobs.len(), jobs);
    }

    #[test_case(""; "empty name")]
    #[test_case("quesiton"; "typo name")]
    #[test_case("both"; "made up name")]
    #[test]
    fn unknown_target_is_an_error(name: &str) {
        let registry = Registry::builtin();
        let result = registry.target(name);
        assert!(matches!(
            result,
            Err(ConfigError::UnknownTarget { name: n }) if n == name
        ));
    }

    #[test]
    fn compress_and_rename_are_optional_in_toml() -> anyhow::Result<()> {
        let result: Registry = indoc! {r#"
            [[target]]
            name = "plain"

            [[target.job]]
            url = "https://blah.org/foo.git"
            branch = "main"
            files = [{ source = "a.txt", dest = "out/a.txt" }]
        "#}
        .parse()?;

        let job = &result.target("plain")?.jobs[0];
        assert!(!job.compress);
        assert_eq!(job.files[0].rename, None);

        Ok(())
    }
}
