// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{CommandSpec, Connector, ParseError, ParsedLine};
use clr_core::EventKind;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fake connector for testing.
///
/// Runs its script with `sh -c`, passing the prompt as `$0`, and records every
/// prompt it builds a command for. Lines starting with `result:` become
/// result events, `bad:` lines must hold valid JSON or they are parse errors,
/// blank lines are dropped, everything else is output.
#[derive(Clone)]
pub struct FakeConnector {
    name: String,
    script: String,
    available: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            available: true,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Prompts passed to `build_command`, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Connector for FakeConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn build_command(&self, prompt: &str) -> CommandSpec {
        self.prompts.lock().push(prompt.to_string());
        CommandSpec::new("sh").arg("-c").arg(&self.script).arg(prompt)
    }

    fn parse_line(&self, line: &str) -> Result<Option<ParsedLine>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if let Some(rest) = line.strip_prefix("result:") {
            return Ok(Some(ParsedLine::new(EventKind::Result, rest)));
        }
        if let Some(rest) = line.strip_prefix("bad:") {
            serde_json::from_str::<serde_json::Value>(rest)?;
        }
        Ok(Some(ParsedLine::new(EventKind::Output, line)))
    }
}
