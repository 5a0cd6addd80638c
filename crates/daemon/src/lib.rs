// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cli-runner daemon library
//!
//! Runs command-line AI tools as background jobs and exposes their output
//! over HTTP as server-sent events.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod duration;
pub mod engine;
mod env;
pub mod lifecycle;
pub mod listener;

pub use config::{Args, Config, ConfigError};
pub use engine::{Job, JobSpec, Registry, RegistryError, Spawner};
pub use lifecycle::{run, LifecycleError};
pub use listener::{ListenCtx, Listener};
