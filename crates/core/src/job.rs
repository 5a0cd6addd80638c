// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, status state machine, and final result.

use crate::event::Payload;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job instance.
    ///
    /// Handed back to the caller on submission and used to stream, query,
    /// stop, and remove the job.
    pub struct JobId("job-");
}

/// Lifecycle status of a job.
///
/// ```text
/// pending ──► running ──► completed | failed | stopped
///    │                          ▲
///    └──────────────────────────┘  (stopped before launch, launch impossible)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Admitted, external process not launched yet
    Pending,
    /// External process launched
    Running,
    /// Process exited with code 0
    Completed,
    /// Process exited non-zero, failed to launch, or its output was unreadable
    Failed,
    /// Cancelled by request or by the deadline
    Stopped,
}

impl JobStatus {
    /// Terminal statuses are absorbing: no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Running) => true,
            (JobStatus::Pending | JobStatus::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Stopped => "stopped",
    }
}

/// Exit code recorded for jobs ended by a stop request or the deadline.
pub const EXIT_CODE_STOPPED: i32 = -1;

/// Final result of a job, set exactly once on terminal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Payload>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobResult {
    pub fn success() -> Self {
        Self { exit_code: 0, output: None, error_message: None }
    }

    pub fn failure(exit_code: i32, message: impl Into<String>) -> Self {
        Self { exit_code, output: None, error_message: Some(message.into()) }
    }

    pub fn stopped(message: impl Into<String>) -> Self {
        Self::failure(EXIT_CODE_STOPPED, message)
    }

    pub fn with_output(mut self, output: Payload) -> Self {
        self.output = Some(output);
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
