// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single job: status, event history, live subscribers, and result cache.
//!
//! All mutable state sits behind one mutex so that status transitions,
//! appends and subscriber changes are observed in one order. The ring buffer
//! carries its own lock and is only pushed while the job lock is held.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clr_core::{
    Clock, Event, EventKind, JobId, JobResult, JobStatus, Payload, RingBuffer, Stamp, SubscriberId,
    SystemClock,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Message recorded when a job is stopped through the API.
pub const STOPPED_BY_REQUEST: &str = "stopped by request";

/// Per-job sizing, derived from the `[process]` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLimits {
    pub buffer_size: usize,
    pub subscriber_capacity: usize,
    pub result_ttl: Duration,
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            subscriber_capacity: 100,
            result_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// What the caller asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub connector: String,
    pub prompt: String,
    pub work_dir: Option<PathBuf>,
}

/// Last `result` payload of a job and when it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub payload: Payload,
    pub expires_at: Instant,
}

impl CachedResult {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct JobInner {
    status: JobStatus,
    completed: Option<Stamp>,
    result: Option<JobResult>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Event>>,
    cache: Option<CachedResult>,
    /// Process group of the job's process, kept until its output is drained
    pgid: Option<u32>,
    /// Set once the history starts overwriting its oldest events
    history_full: bool,
    closed: bool,
}

pub struct Job<C: Clock = SystemClock> {
    id: JobId,
    spec: JobSpec,
    started: Stamp,
    limits: JobLimits,
    clock: C,
    buffer: RingBuffer<Event>,
    cancel: CancellationToken,
    inner: Mutex<JobInner>,
}

impl<C: Clock> Job<C> {
    pub fn new(id: JobId, spec: JobSpec, limits: JobLimits, clock: C) -> Self {
        let started = clock.stamp();
        Self {
            id,
            spec,
            started,
            limits,
            buffer: RingBuffer::new(limits.buffer_size),
            clock,
            cancel: CancellationToken::new(),
            inner: Mutex::new(JobInner {
                status: JobStatus::Pending,
                completed: None,
                result: None,
                subscribers: HashMap::new(),
                cache: None,
                pgid: None,
                history_full: false,
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn started(&self) -> Stamp {
        self.started
    }

    pub fn status(&self) -> JobStatus {
        self.inner.lock().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// When the job reached a terminal state, if it has.
    pub fn completed(&self) -> Option<Stamp> {
        self.inner.lock().completed
    }

    pub fn result(&self) -> Option<JobResult> {
        self.inner.lock().result.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Buffered history, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.buffer.snapshot()
    }

    /// Stamp an event, record it, and offer it to every subscriber.
    ///
    /// Full subscriber channels miss the event; closed ones are pruned.
    /// Returns `false` once the job is closed.
    pub fn append_event(&self, kind: EventKind, payload: Payload) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            tracing::debug!(job_id = %self.id, %kind, "ignoring event for closed job");
            return false;
        }
        self.push(&mut inner, kind, payload);
        true
    }

    /// Append process output, unless the job already reached a terminal
    /// state. Output that races a stop is discarded.
    pub(crate) fn append_output(&self, kind: EventKind, payload: Payload) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || inner.status.is_terminal() {
            tracing::debug!(job_id = %self.id, %kind, "discarding output after job finished");
            return false;
        }
        self.push(&mut inner, kind, payload);
        true
    }

    fn push(&self, inner: &mut JobInner, kind: EventKind, payload: Payload) {
        let event = Event::new(kind, payload, self.clock.epoch_ms());
        if kind == EventKind::Result {
            inner.cache = Some(CachedResult {
                payload: event.payload.clone(),
                expires_at: self.clock.now() + self.limits.result_ttl,
            });
        }
        if !inner.history_full && self.buffer.len() == self.buffer.capacity() {
            inner.history_full = true;
            tracing::warn!(
                job_id = %self.id,
                capacity = self.buffer.capacity(),
                "event history full, overwriting oldest events"
            );
        }
        self.buffer.push(event.clone());
        let id = &self.id;
        inner.subscribers.retain(|sub, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job_id = %id, subscriber = %sub, %kind, "subscriber full, dropping event");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(job_id = %id, subscriber = %sub, "pruning disconnected subscriber");
                false
            }
        });
    }

    /// Register a live subscriber.
    ///
    /// Events appended between a separate [`Job::snapshot`] and this call are
    /// seen twice or not at all; use [`Job::attach`] to avoid that.
    pub fn subscribe(self: &Arc<Self>, sub: SubscriberId) -> (mpsc::Receiver<Event>, Subscription<C>) {
        let mut inner = self.inner.lock();
        self.register(&mut inner, sub)
    }

    /// Take the buffered history and register a subscriber atomically.
    pub fn attach(
        self: &Arc<Self>,
        sub: SubscriberId,
    ) -> (Vec<Event>, mpsc::Receiver<Event>, Subscription<C>) {
        let mut inner = self.inner.lock();
        let history = self.buffer.snapshot();
        let (rx, guard) = self.register(&mut inner, sub);
        (history, rx, guard)
    }

    fn register(
        self: &Arc<Self>,
        inner: &mut JobInner,
        sub: SubscriberId,
    ) -> (mpsc::Receiver<Event>, Subscription<C>) {
        let (tx, rx) = mpsc::channel(self.limits.subscriber_capacity);
        // Dropping the sender leaves the receiver closed for late subscribers
        if !inner.closed {
            inner.subscribers.insert(sub.clone(), tx);
        }
        (rx, Subscription { job: Arc::downgrade(self), sub })
    }

    /// Remove a subscriber. Safe to call repeatedly and after close.
    pub fn unsubscribe(&self, sub: &SubscriberId) {
        self.inner.lock().subscribers.remove(sub);
    }

    /// Last result payload, if written less than `result_ttl` ago.
    pub fn cached_result_payload(&self) -> Option<Payload> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match &inner.cache {
            Some(cache) if cache.is_live(now) => Some(cache.payload.clone()),
            Some(_) => {
                inner.cache = None;
                None
            }
            None => None,
        }
    }

    /// The cache entry if still live, for keeping it past job eviction.
    pub(crate) fn live_cache(&self) -> Option<CachedResult> {
        let now = self.clock.now();
        self.inner.lock().cache.clone().filter(|c| c.is_live(now))
    }

    /// Request the job to stop.
    ///
    /// Cancels the supervisor, kills the job's process group, and moves a
    /// non-terminal job to `stopped`. Returns whether this call transitioned.
    pub fn stop(&self) -> bool {
        self.cancel.cancel();
        let mut inner = self.inner.lock();
        if let Some(pgid) = inner.pgid {
            kill_process_group(&self.id, pgid);
        }
        if inner.status.is_terminal() {
            return false;
        }
        tracing::info!(job_id = %self.id, "job stopped by request");
        self.transition(&mut inner, JobStatus::Stopped, Some(JobResult::stopped(STOPPED_BY_REQUEST)))
    }

    /// `pending` → `running`. Fails if the job left `pending` already.
    pub(crate) fn mark_running(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.status != JobStatus::Pending {
            return false;
        }
        self.transition(&mut inner, JobStatus::Running, None)
    }

    /// Record the launched process group so `stop` can kill it. Fails if the
    /// job was stopped while the process was starting.
    pub(crate) fn set_process_group(&self, pgid: Option<u32>) -> bool {
        let mut inner = self.inner.lock();
        if inner.status.is_terminal() {
            return false;
        }
        inner.pgid = pgid;
        true
    }

    /// Forget the process group once nothing in it can write output.
    pub(crate) fn release_process_group(&self) {
        self.inner.lock().pgid = None;
    }

    /// Enter a terminal state. No-op returning `false` if already terminal.
    pub(crate) fn finish(&self, status: JobStatus, result: JobResult) -> bool {
        let mut inner = self.inner.lock();
        inner.pgid = None;
        self.transition(&mut inner, status, Some(result))
    }

    fn transition(&self, inner: &mut JobInner, next: JobStatus, result: Option<JobResult>) -> bool {
        if !inner.status.can_transition_to(next) {
            return false;
        }
        tracing::debug!(job_id = %self.id, from = %inner.status, to = %next, "job transition");
        inner.status = next;
        if next.is_terminal() {
            inner.completed = Some(self.clock.stamp());
            inner.result = result;
        }
        true
    }

    /// Close every subscriber channel and release the process handle.
    ///
    /// Emits nothing; the supervisor appends `done` first. Idempotent.
    pub(crate) fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.subscribers.clear();
        inner.pgid = None;
    }

    /// Payload of the final `done` event.
    pub(crate) fn done_payload(&self) -> Payload {
        let inner = self.inner.lock();
        Payload::json(&serde_json::json!({
            "jobId": self.id,
            "status": inner.status,
            "result": inner.result,
        }))
    }

    pub fn status_snapshot(&self) -> JobSnapshot {
        let inner = self.inner.lock();
        JobSnapshot {
            id: self.id.clone(),
            connector: self.spec.connector.clone(),
            prompt: self.spec.prompt.clone(),
            work_dir: self.spec.work_dir.clone(),
            status: inner.status,
            started_at: to_datetime(self.started.epoch_ms),
            completed_at: inner.completed.map(|s| to_datetime(s.epoch_ms)),
            result: inner.result.clone(),
        }
    }
}

/// Serializable view of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub connector: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

/// Unsubscribes when dropped.
pub struct Subscription<C: Clock = SystemClock> {
    job: Weak<Job<C>>,
    sub: SubscriberId,
}

impl<C: Clock> Subscription<C> {
    pub fn id(&self) -> &SubscriberId {
        &self.sub
    }
}

impl<C: Clock> Drop for Subscription<C> {
    fn drop(&mut self) {
        if let Some(job) = self.job.upgrade() {
            job.unsubscribe(&self.sub);
        }
    }
}

pub(crate) fn to_datetime(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_default()
}

/// SIGKILL every process in group `pgid`; job processes run in their own group.
pub(crate) fn kill_process_group(job_id: &JobId, pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => tracing::info!(job_id = %job_id, pgid, "killed job process group"),
        Err(e) => tracing::debug!(job_id = %job_id, pgid, error = %e, "kill failed"),
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
