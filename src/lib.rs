// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Republish game-translation patch files from git onto a web server.
//!
//! One deployment run walks the sync jobs of a named target: shallow-clone
//! the job's branch, restore the requested files, optionally compress each
//! into a single-entry archive, and move the artifacts into the web root.
//! A single-instance file lock keeps runs from racing each other, and a
//! best-effort chat notifier announces progress.
//!
//! # Architecture
//!
//! - [`config`]: deployment target registry and job descriptions
//! - [`sync`]: shallow clone and per-file restore into a scratch checkout
//! - [`publish`]: rename, archive, and move artifacts into the web root
//! - [`deploy`]: sequential driver over one target's jobs
//! - [`lock`]: single-instance advisory file lock
//! - [`notify`]: best-effort chat notifications
//! - [`path`]: well-known paths and forced tree removal

pub mod config;
pub mod deploy;
pub mod lock;
pub mod notify;
pub mod path;
pub mod publish;
pub mod sync;
