// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Every override is read here so the names stay in one place. Unset and
//! empty variables are treated the same.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ConfigError, LogFormat};
use crate::duration::parse_duration;

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parsed<T>(
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(value) => match parse(value.trim()) {
            Some(v) => Ok(Some(v)),
            None => Err(ConfigError::Env { var: name, value }),
        },
        None => Ok(None),
    }
}

/// Config file path (`CLR_CONFIG`)
pub fn config_path() -> Option<PathBuf> {
    var("CLR_CONFIG").map(PathBuf::from)
}

/// Listen host (`CLR_HOST`)
pub fn host() -> Option<String> {
    var("CLR_HOST")
}

/// Listen port (`CLR_PORT`)
pub fn port() -> Result<Option<u16>, ConfigError> {
    parsed("CLR_PORT", |s| s.parse().ok())
}

/// Hard deadline per job (`CLR_DEFAULT_TIMEOUT`, e.g. `30m`)
pub fn default_timeout() -> Result<Option<Duration>, ConfigError> {
    parsed("CLR_DEFAULT_TIMEOUT", |s| parse_duration(s).ok())
}

/// Ceiling on pending + running jobs (`CLR_MAX_CONCURRENT`)
pub fn max_concurrent() -> Result<Option<usize>, ConfigError> {
    parsed("CLR_MAX_CONCURRENT", |s| s.parse().ok())
}

/// Age at which finished jobs are evicted (`CLR_CLEANUP_INTERVAL`)
pub fn cleanup_interval() -> Result<Option<Duration>, ConfigError> {
    parsed("CLR_CLEANUP_INTERVAL", |s| parse_duration(s).ok())
}

/// Events kept per job (`CLR_BUFFER_SIZE`)
pub fn buffer_size() -> Result<Option<usize>, ConfigError> {
    parsed("CLR_BUFFER_SIZE", |s| s.parse().ok())
}

/// Per-subscriber channel capacity (`CLR_SUBSCRIBER_CAPACITY`)
pub fn subscriber_capacity() -> Result<Option<usize>, ConfigError> {
    parsed("CLR_SUBSCRIBER_CAPACITY", |s| s.parse().ok())
}

/// How long a job's last result stays readable (`CLR_RESULT_TTL`)
pub fn result_ttl() -> Result<Option<Duration>, ConfigError> {
    parsed("CLR_RESULT_TTL", |s| parse_duration(s).ok())
}

/// Shutdown and post-exit drain bound (`CLR_DRAIN_TIMEOUT`)
pub fn drain_timeout() -> Result<Option<Duration>, ConfigError> {
    parsed("CLR_DRAIN_TIMEOUT", |s| parse_duration(s).ok())
}

/// Log filter (`CLR_LOG`). `RUST_LOG` takes precedence when set.
pub fn log_level() -> Option<String> {
    var("CLR_LOG")
}

/// Log format (`CLR_LOG_FORMAT`: `json` or `pretty`)
pub fn log_format() -> Result<Option<LogFormat>, ConfigError> {
    parsed("CLR_LOG_FORMAT", |s| s.parse().ok())
}

/// Log file path (`CLR_LOG_FILE`)
pub fn log_file() -> Option<PathBuf> {
    var("CLR_LOG_FILE").map(PathBuf::from)
}

/// Standard `RUST_LOG` filter, which wins over the configured level
pub fn rust_log() -> Option<String> {
    var("RUST_LOG")
}
