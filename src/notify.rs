// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Chat progress notifications.
//!
//! A deployment announces itself to a chat channel so the translation team
//! can see runs start and finish without shelling into the web server.
//! Delivery is strictly best-effort: the deployment's success is independent
//! of whether any message arrived, so callers log and swallow every error
//! coming out of here.
//!
//! The notifier is constructed once in `main` and passed by reference to
//! whoever needs it. Credentials come from a secret file at a fixed relative
//! path, trimmed of surrounding whitespace; when that file is unusable the
//! run proceeds with [`Muted`] instead.

use reqwest::{header::AUTHORIZATION, Client};
use std::{fs::read_to_string, path::{Path, PathBuf}, time::Duration};
use tracing::debug;

/// Fixed relative path of the bot token secret file.
pub const DEFAULT_TOKEN_PATH: &str = "token.token";

/// Channel that receives deployment progress messages.
pub const BOT_SPAM_CHANNEL_ID: u64 = 557048243696042055;

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Deliver a progress message to the chat channel.
pub trait Notify {
    /// Send one message. Best-effort at every call site.
    fn send(&self, text: &str) -> impl std::future::Future<Output = Result<()>>;
}

/// Notifier backed by the Discord REST API.
///
/// Holds one long-lived HTTP client so every message of a run reuses the
/// same authenticated connection.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    http: Client,
    token: String,
    channel_id: u64,
    api_base: String,
}

impl DiscordNotifier {
    /// Construct new notifier from a bot token.
    pub fn new(token: impl Into<String>, channel_id: u64) -> Self {
        let http = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            token: token.into(),
            channel_id,
            api_base: DEFAULT_API_BASE.into(),
        }
    }

    /// Construct new notifier with the token loaded from a secret file.
    ///
    /// The token is trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// - Return [`NotifyError::TokenFile`] if the secret file cannot be
    ///   read.
    /// - Return [`NotifyError::EmptyToken`] if the secret file holds only
    ///   whitespace.
    pub fn from_token_file(path: impl AsRef<Path>, channel_id: u64) -> Result<Self> {
        let path = path.as_ref();
        let token = read_to_string(path)
            .map_err(|err| NotifyError::TokenFile {
                source: err,
                path: path.to_path_buf(),
            })?
            .trim()
            .to_owned();

        if token.is_empty() {
            return Err(NotifyError::EmptyToken {
                path: path.to_path_buf(),
            });
        }

        Ok(Self::new(token, channel_id))
    }

    /// Swap the API base URL. Tests point this at an unroutable address.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl Notify for DiscordNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        debug!("notifying channel {}", self.channel_id);

        self.http
            .post(url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(NotifyError::Send)?;

        Ok(())
    }
}

/// Notifier that drops every message.
///
/// Stand-in for when no usable credentials exist, keeping the deployment
/// path identical with and without a configured bot.
#[derive(Debug, Default, Clone, Copy)]
pub struct Muted;

impl Notify for Muted {
    async fn send(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Notification error types.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Secret file cannot be read.
    #[error("failed to read bot token at {:?}", path.display())]
    TokenFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Secret file holds no token.
    #[error("bot token file at {:?} is empty", path.display())]
    EmptyToken { path: PathBuf },

    /// Message dispatch failed.
    #[error(transparent)]
    Send(#[from] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = NotifyError> = std::result::Result<T, E>;
