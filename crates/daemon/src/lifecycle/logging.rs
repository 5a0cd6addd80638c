// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::env;

use super::LifecycleError;

/// Install the global subscriber.
///
/// Logs go to stdout, or to a daily-rolling file when configured. The
/// returned guard flushes buffered lines on drop and must be held for the
/// life of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard, LifecycleError> {
    let filter = env_filter(env::rust_log().as_deref(), &config.level)?;

    let (writer, guard) = match &config.file {
        Some(path) => {
            let (dir, prefix) = log_target(path)?;
            std::fs::create_dir_all(&dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix))
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(config.file.is_none() && config.format == LogFormat::Pretty);
    let installed = match config.format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    installed.map_err(|e| LifecycleError::Logging(e.to_string()))?;
    Ok(guard)
}

/// `RUST_LOG` when set, otherwise the configured level.
fn env_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter, LifecycleError> {
    let directives = rust_log.unwrap_or(level);
    EnvFilter::try_new(directives)
        .map_err(|e| LifecycleError::Logging(format!("invalid log filter {directives:?}: {e}")))
}

/// Split a log path into the directory and file-name prefix the rolling
/// appender expects.
fn log_target(path: &Path) -> Result<(PathBuf, OsString), LifecycleError> {
    let prefix = path
        .file_name()
        .ok_or_else(|| LifecycleError::Logging(format!("log file has no name: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, prefix.to_os_string()))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
