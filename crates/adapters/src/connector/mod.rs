// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connectors: how to invoke one external tool and read its output.
//!
//! The engine is polymorphic over [`Connector`]. A connector builds the
//! concrete command line for a prompt and turns each line the tool prints
//! into zero or one events. Connectors never fail a job: lines they do not
//! understand are dropped, and malformed lines are reported as a
//! [`ParseError`] which the engine logs and skips.

mod claude;
mod command;
mod registry;

pub use claude::ClaudeConnector;
pub use command::CommandConnector;
pub use registry::ConnectorRegistry;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConnector;

use clr_core::{EventKind, Payload};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors from connector lookup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("connector '{0}' not found")]
    NotFound(String),
    #[error("connector '{0}' is unavailable")]
    Unavailable(String),
}

/// A line that looked like the connector's output format but could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON line: {0}")]
    Json(#[from] serde_json::Error),
}

/// Concrete command line for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// An event produced from one output line, before the engine stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub kind: EventKind,
    pub payload: Payload,
}

impl ParsedLine {
    pub fn new(kind: EventKind, payload: impl Into<Payload>) -> Self {
        Self { kind, payload: payload.into() }
    }
}

/// Strategy for one external tool.
pub trait Connector: Send + Sync + 'static {
    /// Name callers use to select this connector
    fn name(&self) -> &str;

    /// Whether jobs may currently be admitted for this connector
    fn is_available(&self) -> bool;

    /// Command line running `prompt` through the tool
    fn build_command(&self, prompt: &str) -> CommandSpec;

    /// Turn one output line into an event.
    ///
    /// `Ok(None)` drops the line silently (blank lines, unrecognized formats).
    fn parse_line(&self, line: &str) -> Result<Option<ParsedLine>, ParseError>;
}

/// Which built-in connector a configuration entry instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Claude CLI streaming JSON
    #[default]
    Claude,
    /// Any command; JSON lines pass through, text lines are wrapped
    Command,
}

/// Configuration for one connector entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub kind: ConnectorKind,
    pub command: String,
    pub args: Vec<String>,
    pub available: bool,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            kind: ConnectorKind::Claude,
            command: "claude".to_string(),
            args: ClaudeConnector::DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
            available: true,
        }
    }
}

/// Instantiate the connector described by `settings` under `name`.
pub fn from_settings(name: &str, settings: &ConnectorSettings) -> Arc<dyn Connector> {
    match settings.kind {
        ConnectorKind::Claude => Arc::new(ClaudeConnector::new(name, settings.clone())),
        ConnectorKind::Command => Arc::new(CommandConnector::new(name, settings.clone())),
    }
}

/// Classify a JSON object line by its `type` field.
fn kind_of_json_line(value: &serde_json::Value) -> EventKind {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("result") => EventKind::Result,
        _ => EventKind::Output,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
