// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Event, EventKind, Payload};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core types.
pub mod strategies {
    use crate::JobStatus;
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::Running),
            Just(JobStatus::Completed),
            Just(JobStatus::Failed),
            Just(JobStatus::Stopped),
        ]
    }
}

// ── Event factory functions ─────────────────────────────────────────────

pub fn output_event(text: &str) -> Event {
    Event::new(EventKind::Output, Payload::json(&serde_json::json!({ "line": text })), 1_000)
}

pub fn result_event(raw: &str) -> Event {
    Event::new(EventKind::Result, Payload::from(raw), 1_000)
}
