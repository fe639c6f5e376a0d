// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use patchpub::{
    config::Registry,
    deploy::{send_best_effort, Driver, RunReport},
    lock::InstanceLock,
    notify::{DiscordNotifier, Muted, Notify, BOT_SPAM_CHANNEL_ID, DEFAULT_TOKEN_PATH},
    path::{default_lock_path, resolve_web_root},
    publish::{archive::SevenZip, Publisher},
    sync::GitCli,
};

use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, process::exit, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "patchpub [options] <target> [web_root]",
    version
)]
struct Cli {
    /// Deployment target to publish ("question" or "answer").
    #[arg(value_name = "target")]
    pub target: String,

    /// Web root the artifacts land under.
    #[arg(value_name = "web_root")]
    pub web_root: Option<String>,

    /// Substitute registry TOML instead of the built-in table.
    #[arg(long, value_name = "path")]
    pub registry: Option<PathBuf>,

    /// Lock file path for the single-instance guard.
    #[arg(long, value_name = "path")]
    pub lock_file: Option<PathBuf>,

    /// Seconds to wait before starting, debouncing near-simultaneous triggers.
    #[arg(long, value_name = "secs", default_value_t = 0)]
    pub debounce: u64,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    let cli = Cli::parse();

    // INVARIANT: Construct the notifier exactly once; a missing or unusable
    // token mutes notifications without touching the deployment path.
    let code = match DiscordNotifier::from_token_file(DEFAULT_TOKEN_PATH, BOT_SPAM_CHANNEL_ID) {
        Ok(notifier) => run(cli, &notifier).await,
        Err(error) => {
            warn!("running without notifications: {error}");
            run(cli, &Muted).await
        }
    };

    exit(code)
}

/// Two-phase entry point: execute the deployment, then report the outcome.
async fn run<N>(cli: Cli, notifier: &N) -> i32
where
    N: Notify,
{
    match deploy(cli, notifier).await {
        Ok(report) => {
            info!(
                "deployment of {:?} was successful ({} jobs, {} artifacts)",
                report.target, report.jobs, report.artifacts
            );
            send_best_effort(notifier, "Deployment was successful!").await;
            0
        }
        Err(error) => {
            error!("{error:?}");
            send_best_effort(notifier, &format!("Task Failed!: {error}")).await;
            1
        }
    }
}

async fn deploy<N>(cli: Cli, notifier: &N) -> Result<RunReport>
where
    N: Notify,
{
    let registry = match &cli.registry {
        Some(path) => Registry::load(path)?,
        None => Registry::builtin(),
    };
    let target = registry.target(&cli.target)?;
    let web_root = resolve_web_root(cli.web_root.as_deref())?;
    info!("web root: {:?}, target: {:?}", web_root.display(), target.name);

    if cli.debounce > 0 {
        info!("debouncing for {}s before locking", cli.debounce);
        tokio::time::sleep(Duration::from_secs(cli.debounce)).await;
    }

    // INVARIANT: Held until process exit; release is implicit.
    let _lock = InstanceLock::acquire(cli.lock_file.unwrap_or_else(default_lock_path))?;

    let driver = Driver::new(GitCli, Publisher::new(SevenZip));
    let report = driver.run(target, &web_root, notifier).await?;

    Ok(report)
}
