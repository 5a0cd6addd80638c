// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    output = { EventKind::Output, "output" },
    result = { EventKind::Result, "result" },
    error  = { EventKind::Error,  "error" },
    done   = { EventKind::Done,   "done" },
)]
fn kind_display_matches_serde(kind: EventKind, expected: &str) {
    assert_eq!(kind.to_string(), expected);
    assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{expected}\""));
}

#[test]
fn json_payload_is_embedded_verbatim() {
    let payload = Payload::from(r#"{"type":"result","n":1}"#);
    let json = serde_json::to_string(&payload).unwrap();
    assert_eq!(json, r#"{"type":"result","n":1}"#);
}

#[test]
fn non_json_payload_serializes_as_string() {
    let payload = Payload::from("plain text");
    assert!(payload.as_json().is_none());
    assert_eq!(serde_json::to_string(&payload).unwrap(), "\"plain text\"");
}

#[test]
fn invalid_utf8_payload_serializes_lossily() {
    let payload = Payload::new(vec![b'a', 0xff, b'b']);
    assert_eq!(serde_json::to_string(&payload).unwrap(), "\"a\u{fffd}b\"");
}

#[test]
fn payload_from_json_value() {
    let payload = Payload::json(&serde_json::json!({ "error": "boom" }));
    assert_eq!(payload.to_text(), r#"{"error":"boom"}"#);
    assert_eq!(payload.len(), 16);
    assert!(!payload.is_empty());
}

#[test]
fn payload_clones_share_storage() {
    let a = Payload::from("shared");
    let b = a.clone();
    assert_eq!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
}

#[test]
fn debug_truncates_long_payloads() {
    let payload = Payload::from("é".repeat(500));
    let debug = format!("{payload:?}");
    assert!(debug.chars().count() < 140);
}

#[test]
fn done_detection() {
    assert!(Event::new(EventKind::Done, Payload::from("{}"), 0).is_done());
    assert!(!Event::new(EventKind::Error, Payload::from("{}"), 0).is_done());
}
