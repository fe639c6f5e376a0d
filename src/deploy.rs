// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment driver.
//!
//! Run every sync job of one deployment target sequentially: materialize
//! the job's files through [`RepoSource`], hand them to the [`Publisher`],
//! then reclaim the scratch checkout. Jobs never run in parallel — the
//! configured registry keeps destination paths disjoint across jobs, so
//! ordering only matters for log readability, but there is no reason to
//! interleave clone output either.
//!
//! The driver announces the start of a run through the injected notifier
//! and returns a [`RunReport`] value; reporting the final outcome is the
//! caller's second phase. Notification failures are logged and swallowed,
//! never allowed to fail the deployment itself.

use crate::{
    config::DeployTarget,
    notify::Notify,
    publish::{archive::Archive, PublishError, Publisher},
    sync::{RepoSource, SyncError},
};

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Sequential executor for one deployment target.
#[derive(Debug, Default)]
pub struct Driver<S, A>
where
    S: RepoSource,
    A: Archive,
{
    source: S,
    publisher: Publisher<A>,
}

impl<S, A> Driver<S, A>
where
    S: RepoSource,
    A: Archive,
{
    /// Construct new driver over a repository source and a publisher.
    pub fn new(source: S, publisher: Publisher<A>) -> Self {
        Self { source, publisher }
    }

    /// Execute every sync job of `target` against `web_root`, in order.
    ///
    /// # Errors
    ///
    /// - Return [`DeployError::Sync`] if a clone or checkout fails; the run
    ///   stops at the failing job.
    /// - Return [`DeployError::Publish`] if an artifact cannot be archived
    ///   or moved into place; the run stops at the failing job.
    pub async fn run<N>(
        &self,
        target: &DeployTarget,
        web_root: &Path,
        notifier: &N,
    ) -> Result<RunReport>
    where
        N: Notify,
    {
        send_best_effort(notifier, &format!("{} deployment started...", target.name)).await;
        info!(
            "deploying target {:?} into web root {:?}",
            target.name,
            web_root.display()
        );

        let mut artifacts = 0;
        for job in &target.jobs {
            let sources: Vec<PathBuf> = job.files.iter().map(|spec| spec.source.clone()).collect();
            let checkout = self.source.sync(&job.url, &job.branch, &sources)?;
            self.publisher
                .publish(checkout.root(), &job.files, web_root, job.compress)?;
            artifacts += job.files.len();
            checkout.close()?;
        }

        Ok(RunReport {
            target: target.name.clone(),
            jobs: target.jobs.len(),
            artifacts,
        })
    }
}

/// Outcome of a successful run, for the caller's reporting phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Name of the deployed target.
    pub target: String,

    /// Number of sync jobs executed.
    pub jobs: usize,

    /// Number of artifacts placed under the web root.
    pub artifacts: usize,
}

/// Send one message, logging and swallowing any delivery failure.
pub async fn send_best_effort<N>(notifier: &N, text: &str)
where
    N: Notify,
{
    if let Err(error) = notifier.send(text).await {
        warn!("failed to send bot message: {error}");
    }
}

/// Driver error types.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Clone or checkout of a required path failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Artifact could not be published.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Friendly result alias :3
pub type Result<T, E = DeployError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{FileSpec, Registry, SyncJob},
        notify::{self, Notify},
        publish::archive::GzWriter,
        sync::Checkout,
    };
    use pretty_assertions::assert_eq;
    use std::{fs, sync::Mutex};

    /// Repo source double that writes canned files into a scratch tree.
    #[derive(Default)]
    struct CannedSource {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RepoSource for CannedSource {
        fn sync(
            &self,
            url: &str,
            branch: &str,
            sources: &[PathBuf],
        ) -> crate::sync::Result<Checkout> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_owned(), branch.to_owned()));

            let scratch = tempfile::Builder::new()
                .prefix("patchpub-test-")
                .tempdir()
                .unwrap()
                .keep();
            for source in sources {
                if let Some(parent) = source.parent() {
                    fs::create_dir_all(scratch.join(parent)).unwrap();
                }
                fs::write(scratch.join(source), format!("{branch} tip of {source:?}")).unwrap();
            }

            Ok(Checkout::new(scratch))
        }
    }

    /// Repo source double that always fails to clone.
    struct DeadRemote;

    impl RepoSource for DeadRemote {
        fn sync(
            &self,
            url: &str,
            branch: &str,
            _sources: &[PathBuf],
        ) -> crate::sync::Result<Checkout> {
            Err(SyncError::Clone {
                source: std::io::Error::other("remote hung up"),
                url: url.to_owned(),
                branch: branch.to_owned(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl Notify for RecordingNotifier {
        async fn send(&self, text: &str) -> notify::Result<()> {
            self.messages.lock().unwrap().push(text.to_owned());
            Ok(())
        }
    }

    fn two_job_target() -> DeployTarget {
        DeployTarget {
            name: "question".into(),
            jobs: vec![
                SyncJob {
                    url: "https://blah.org/question.git".into(),
                    branch: "master".into(),
                    compress: false,
                    files: vec![FileSpec {
                        source: "scripts/0.utf".into(),
                        rename: None,
                        dest: "Beato/script-full.txt".into(),
                    }],
                },
                SyncJob {
                    url: "https://blah.org/question.git".into(),
                    branch: "voice_only".into(),
                    compress: false,
                    files: vec![FileSpec {
                        source: "scripts/0.utf".into(),
                        rename: None,
                        dest: "Beato/script-voice-only.txt".into(),
                    }],
                },
            ],
        }
    }

    #[tokio::test]
    async fn runs_every_job_in_configured_order() -> anyhow::Result<()> {
        let web_root = tempfile::tempdir()?;
        let source = CannedSource::default();
        let notifier = RecordingNotifier::default();
        let driver = Driver::new(source, Publisher::new(GzWriter));
        let target = two_job_target();

        let report = driver.run(&target, web_root.path(), &notifier).await?;

        assert_eq!(
            report,
            RunReport {
                target: "question".into(),
                jobs: 2,
                artifacts: 2,
            }
        );
        assert_eq!(
            *driver.source.calls.lock().unwrap(),
            vec![
                ("https://blah.org/question.git".into(), "master".into()),
                ("https://blah.org/question.git".into(), "voice_only".into()),
            ]
        );
        assert!(web_root.path().join("Beato/script-full.txt").is_file());
        assert!(web_root.path().join("Beato/script-voice-only.txt").is_file());
        assert_eq!(
            *notifier.messages.lock().unwrap(),
            vec!["question deployment started...".to_owned()]
        );

        Ok(())
    }

    #[tokio::test]
    async fn sync_failure_aborts_the_run() -> anyhow::Result<()> {
        let web_root = tempfile::tempdir()?;
        let notifier = RecordingNotifier::default();
        let driver = Driver::new(DeadRemote, Publisher::new(GzWriter));
        let target = two_job_target();

        let result = driver.run(&target, web_root.path(), &notifier).await;

        assert!(matches!(result, Err(DeployError::Sync(_))));
        assert!(!web_root.path().join("Beato").exists());

        Ok(())
    }

    #[tokio::test]
    async fn builtin_registry_targets_drive_cleanly() -> anyhow::Result<()> {
        let web_root = tempfile::tempdir()?;
        let source = CannedSource::default();
        let notifier = RecordingNotifier::default();
        let driver = Driver::new(source, Publisher::new(GzWriter));
        let registry = Registry::builtin();

        let report = driver
            .run(registry.target("answer")?, web_root.path(), &notifier)
            .await?;

        assert_eq!(report.jobs, 2);
        assert_eq!(report.artifacts, 3);
        assert!(web_root.path().join("Bern/script-full.zip").is_file());
        assert!(web_root.path().join("Bern/script-voice-only.zip").is_file());
        assert!(web_root.path().join("Bern/script-adv-mode.zip").is_file());

        Ok(())
    }
}
