// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude CLI connector.
//!
//! Runs `claude [args…] -p <prompt>` and reads its `stream-json` output:
//! one JSON object per line, the final one having `"type": "result"`.

use super::{kind_of_json_line, CommandSpec, Connector, ConnectorSettings, ParseError, ParsedLine};

pub struct ClaudeConnector {
    name: String,
    settings: ConnectorSettings,
}

impl ClaudeConnector {
    /// Arguments that make the CLI print one JSON event per line.
    pub const DEFAULT_ARGS: &'static [&'static str] =
        &["--output-format", "stream-json", "--verbose"];

    pub fn new(name: impl Into<String>, settings: ConnectorSettings) -> Self {
        Self { name: name.into(), settings }
    }
}

impl Connector for ClaudeConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.settings.available
    }

    fn build_command(&self, prompt: &str) -> CommandSpec {
        CommandSpec::new(&self.settings.command).args(&self.settings.args).arg("-p").arg(prompt)
    }

    fn parse_line(&self, line: &str) -> Result<Option<ParsedLine>, ParseError> {
        let line = line.trim();
        // stderr chatter and banners are not part of the stream
        if !line.starts_with('{') {
            return Ok(None);
        }
        let value: serde_json::Value = serde_json::from_str(line)?;
        Ok(Some(ParsedLine::new(kind_of_json_line(&value), line)))
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
