// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clr_core::EventKind;

fn connector() -> ClaudeConnector {
    ClaudeConnector::new("claude", ConnectorSettings::default())
}

#[test]
fn builds_prompt_command_with_configured_args() {
    let settings = ConnectorSettings {
        command: "/usr/local/bin/claude".to_string(),
        args: vec!["--model".to_string(), "opus".to_string()],
        ..ConnectorSettings::default()
    };
    let spec = ClaudeConnector::new("claude", settings).build_command("hello world");
    assert_eq!(spec.program, "/usr/local/bin/claude");
    assert_eq!(spec.args, vec!["--model", "opus", "-p", "hello world"]);
}

#[test]
fn default_command_streams_json() {
    let spec = connector().build_command("hi");
    assert_eq!(spec.to_string(), "claude --output-format stream-json --verbose -p hi");
}

#[yare::parameterized(
    system    = { r#"{"type":"system","subtype":"init"}"#,          EventKind::Output },
    assistant = { r#"{"type":"assistant","message":{"content":[]}}"#, EventKind::Output },
    untyped   = { r#"{"foo":1}"#,                                  EventKind::Output },
    result    = { r#"{"type":"result","result":"done","is_error":false}"#, EventKind::Result },
)]
fn classifies_json_lines(line: &str, kind: EventKind) {
    let parsed = connector().parse_line(line).unwrap().unwrap();
    assert_eq!(parsed.kind, kind);
    assert_eq!(parsed.payload.to_text(), line);
}

#[yare::parameterized(
    blank      = { "" },
    whitespace = { "   \t" },
    text       = { "Warning: something on stderr" },
    array      = { "[1,2,3]" },
)]
fn drops_lines_outside_the_stream(line: &str) {
    assert!(connector().parse_line(line).unwrap().is_none());
}

#[test]
fn trims_surrounding_whitespace() {
    let parsed = connector().parse_line("  {\"type\":\"result\"}\r").unwrap().unwrap();
    assert_eq!(parsed.payload.to_text(), "{\"type\":\"result\"}");
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(connector().parse_line("{\"type\":").is_err());
}

#[test]
fn availability_follows_settings() {
    let settings = ConnectorSettings { available: false, ..ConnectorSettings::default() };
    assert!(!ClaudeConnector::new("claude", settings).is_available());
    assert!(connector().is_available());
}
