// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Layered lowest to highest: built-in defaults, a TOML file, `CLR_*`
//! environment variables, then command-line flags.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use clr_adapters::ConnectorSettings;
use serde::Deserialize;
use thiserror::Error;

use crate::duration::serde_str;
use crate::engine::{JobLimits, RegistrySettings, SpawnerSettings};
use crate::env;

/// Files tried, in order, when no path is given.
const DEFAULT_PATHS: &[&str] = &["config.toml", "config/config.toml"];

/// Connector registered when the configuration names none.
pub const DEFAULT_CONNECTOR: &str = "claude";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Command-line flags of `clrd`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "clrd", version, about = "Run command-line AI tools as streamable HTTP jobs")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    #[serde(deserialize_with = "serde_str::deserialize")]
    pub default_timeout: Duration,
    pub max_concurrent: usize,
    #[serde(deserialize_with = "serde_str::deserialize")]
    pub cleanup_interval: Duration,
    pub buffer_size: usize,
    pub subscriber_capacity: usize,
    #[serde(deserialize_with = "serde_str::deserialize")]
    pub result_ttl: Duration,
    #[serde(deserialize_with = "serde_str::deserialize")]
    pub drain_timeout: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30 * 60),
            max_concurrent: 10,
            cleanup_interval: Duration::from_secs(5 * 60),
            buffer_size: 8192,
            subscriber_capacity: 100,
            result_ttl: Duration::from_secs(10 * 60),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `clr_daemon=debug`
    pub level: String,
    pub format: LogFormat,
    /// Daily-rolling log file; stdout when unset
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Json, file: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub process: ProcessConfig,
    pub logging: LoggingConfig,
    pub connectors: BTreeMap<String, ConnectorSettings>,
}

impl Config {
    /// Load the effective configuration for `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let config = match locate(args.config.as_deref()) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.with_env()?.with_args(args).validated()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply `CLR_*` overrides.
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        if let Some(host) = env::host() {
            self.server.host = host;
        }
        if let Some(port) = env::port()? {
            self.server.port = port;
        }
        if let Some(timeout) = env::default_timeout()? {
            self.process.default_timeout = timeout;
        }
        if let Some(max) = env::max_concurrent()? {
            self.process.max_concurrent = max;
        }
        if let Some(interval) = env::cleanup_interval()? {
            self.process.cleanup_interval = interval;
        }
        if let Some(size) = env::buffer_size()? {
            self.process.buffer_size = size;
        }
        if let Some(capacity) = env::subscriber_capacity()? {
            self.process.subscriber_capacity = capacity;
        }
        if let Some(ttl) = env::result_ttl()? {
            self.process.result_ttl = ttl;
        }
        if let Some(drain) = env::drain_timeout()? {
            self.process.drain_timeout = drain;
        }
        if let Some(level) = env::log_level() {
            self.logging.level = level;
        }
        if let Some(format) = env::log_format()? {
            self.logging.format = format;
        }
        if let Some(file) = env::log_file() {
            self.logging.file = Some(file);
        }
        Ok(self)
    }

    /// Apply command-line flags.
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        self
    }

    /// Check limits and fill in the default connector.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host", "must not be empty"));
        }
        let process = &self.process;
        for (field, value) in [
            ("process.max_concurrent", process.max_concurrent),
            ("process.buffer_size", process.buffer_size),
            ("process.subscriber_capacity", process.subscriber_capacity),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        for (field, value) in [
            ("process.default_timeout", process.default_timeout),
            ("process.cleanup_interval", process.cleanup_interval),
            ("process.result_ttl", process.result_ttl),
            ("process.drain_timeout", process.drain_timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "must be greater than zero"));
            }
        }
        for (name, settings) in &self.connectors {
            if settings.command.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "connectors",
                    reason: format!("connector '{name}' has no command"),
                });
            }
        }

        if self.logging.file.as_ref().is_some_and(|f| f.as_os_str().is_empty()) {
            self.logging.file = None;
        }
        if self.connectors.is_empty() {
            self.connectors.insert(DEFAULT_CONNECTOR.to_string(), ConnectorSettings::default());
        }
        Ok(self)
    }

    /// `host:port`, bracketing bare IPv6 hosts.
    pub fn bind_addr(&self) -> String {
        let host = &self.server.host;
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.server.port)
        } else {
            format!("{}:{}", host, self.server.port)
        }
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            max_concurrent: self.process.max_concurrent,
            cleanup_interval: self.process.cleanup_interval,
            limits: JobLimits {
                buffer_size: self.process.buffer_size,
                subscriber_capacity: self.process.subscriber_capacity,
                result_ttl: self.process.result_ttl,
            },
        }
    }

    pub fn spawner_settings(&self) -> SpawnerSettings {
        SpawnerSettings {
            default_timeout: self.process.default_timeout,
            drain_timeout: self.process.drain_timeout,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.to_string() }
}

/// Resolve the config file: explicit flag, `CLR_CONFIG`, then the default
/// locations that exist.
fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env::config_path() {
        return Some(path);
    }
    DEFAULT_PATHS.iter().map(PathBuf::from).find(|p| p.is_file())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
