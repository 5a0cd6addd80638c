// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events produced while a job runs.
//!
//! The payload is opaque to the engine. Connectors usually hand it raw JSON
//! lines from the tool they wrap; it is embedded verbatim on the wire when it
//! is valid JSON and sent as a string otherwise.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use std::sync::Arc;

/// Kind of a job event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Incremental output from the tool
    Output,
    /// The tool's final answer; also written to the job's result cache
    Result,
    /// A failure reported by the engine (non-zero exit, timeout, stop)
    Error,
    /// Final event of every job
    Done,
}

crate::simple_display! {
    EventKind {
        Output => "output",
        Result => "result",
        Error => "error",
        Done => "done",
    }
}

/// Opaque event payload, cheap to clone across subscribers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Serialize a JSON value into a payload.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(value.to_string())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the payload as raw JSON, if it is valid JSON.
    pub fn as_json(&self) -> Option<&RawValue> {
        serde_json::from_slice::<&RawValue>(&self.0).ok()
    }

    /// Payload text, with invalid UTF-8 replaced.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text: String = self.to_text().chars().take(120).collect();
        write!(f, "Payload({text:?})")
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_json() {
            Some(raw) => raw.serialize(serializer),
            None => serializer.serialize_str(&self.to_text()),
        }
    }
}

/// One timestamped unit of job output or status. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub payload: Payload,
    pub timestamp_ms: u64,
}

impl Event {
    pub fn new(kind: EventKind, payload: Payload, timestamp_ms: u64) -> Self {
        Self { kind, payload, timestamp_ms }
    }

    pub fn is_done(&self) -> bool {
        self.kind == EventKind::Done
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
