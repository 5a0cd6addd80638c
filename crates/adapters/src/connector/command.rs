// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic command connector for tools without a dedicated connector.
//!
//! The prompt replaces every `{prompt}` placeholder in the configured
//! arguments; without a placeholder it is appended as the last argument.
//! JSON object lines pass through unchanged (a `"type": "result"` object is a
//! result event); text lines are wrapped as `{"line": "<text>"}`.

use super::{kind_of_json_line, CommandSpec, Connector, ConnectorSettings, ParseError, ParsedLine};
use clr_core::{EventKind, Payload};

const PROMPT_PLACEHOLDER: &str = "{prompt}";

pub struct CommandConnector {
    name: String,
    settings: ConnectorSettings,
}

impl CommandConnector {
    pub fn new(name: impl Into<String>, settings: ConnectorSettings) -> Self {
        Self { name: name.into(), settings }
    }
}

impl Connector for CommandConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.settings.available
    }

    fn build_command(&self, prompt: &str) -> CommandSpec {
        let spec = CommandSpec::new(&self.settings.command);
        if self.settings.args.iter().any(|a| a.contains(PROMPT_PLACEHOLDER)) {
            spec.args(self.settings.args.iter().map(|a| a.replace(PROMPT_PLACEHOLDER, prompt)))
        } else {
            spec.args(&self.settings.args).arg(prompt)
        }
    }

    fn parse_line(&self, line: &str) -> Result<Option<ParsedLine>, ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.starts_with('{') {
            // Tools mixing JSON and prose are common; fall back to text.
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                return Ok(Some(ParsedLine::new(kind_of_json_line(&value), trimmed)));
            }
        }
        let text = line.trim_end();
        let payload = Payload::json(&serde_json::json!({ "line": text }));
        Ok(Some(ParsedLine::new(EventKind::Output, payload)))
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
