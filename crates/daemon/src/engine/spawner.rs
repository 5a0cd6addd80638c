// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launches and supervises the external process behind each job.
//!
//! One tracked task per job drives it from `pending` to a terminal state.
//! Output lines from stdout and stderr are merged into a single reader,
//! parsed by the job's connector, and appended as events. The exit is raced
//! against the job's cancellation token and its deadline.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use clr_adapters::{CommandSpec, Connector, OutputLineCodec};
use clr_core::{Clock, EventKind, JobResult, JobStatus, Payload};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::task::TaskTracker;

use super::job::{kill_process_group, Job, STOPPED_BY_REQUEST};
use crate::duration::format_duration;

/// Request-time spawn failures. Failures of the job itself are recorded in
/// its result and event stream instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("daemon is shutting down")]
    ShuttingDown,
}

/// Why a process could not be started.
#[derive(Debug, Error)]
enum LaunchError {
    #[error("working directory {0} does not exist")]
    WorkDir(PathBuf),

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("failed to start {program}: {source}")]
    Io { program: String, source: io::Error },

    #[error("process output is not piped")]
    Pipes,
}

impl LaunchError {
    fn from_io(program: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => LaunchError::NotFound(program.to_string()),
            io::ErrorKind::PermissionDenied => LaunchError::PermissionDenied(program.to_string()),
            _ => LaunchError::Io { program: program.to_string(), source },
        }
    }

    /// Shell convention: 127 not found, 126 not executable.
    fn exit_code(&self) -> i32 {
        match self {
            LaunchError::NotFound(_) => 127,
            LaunchError::PermissionDenied(_) => 126,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnerSettings {
    /// Hard deadline for one job
    pub default_timeout: Duration,
    /// How long to wait for buffered output after exit, and for jobs at shutdown
    pub drain_timeout: Duration,
}

impl Default for SpawnerSettings {
    fn default() -> Self {
        Self { default_timeout: Duration::from_secs(30 * 60), drain_timeout: Duration::from_secs(5) }
    }
}

pub struct Spawner {
    settings: SpawnerSettings,
    tracker: TaskTracker,
}

impl Spawner {
    pub fn new(settings: SpawnerSettings) -> Self {
        Self { settings, tracker: TaskTracker::new() }
    }

    pub fn settings(&self) -> &SpawnerSettings {
        &self.settings
    }

    /// Start supervising `job`.
    ///
    /// After [`Spawner::close`] the job is failed and closed on the spot.
    pub fn spawn<C: Clock>(
        &self,
        job: Arc<Job<C>>,
        connector: Arc<dyn Connector>,
    ) -> Result<(), SpawnError> {
        if self.tracker.is_closed() {
            tracing::warn!(job_id = %job.id(), "rejecting job, spawner closed");
            let message = SpawnError::ShuttingDown.to_string();
            job.finish(JobStatus::Failed, JobResult::failure(1, &message));
            job.append_event(EventKind::Error, error_payload(&message));
            drop(Finalize { job });
            return Err(SpawnError::ShuttingDown);
        }
        self.tracker.spawn(supervise(job, connector, self.settings));
        Ok(())
    }

    /// Stop accepting new jobs.
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Number of supervisors still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for running supervisors after [`Spawner::close`], up to `timeout`.
    /// Returns `false` if some were still running.
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }
}

/// Guarantees a job ends terminal with `done` appended and subscribers
/// closed, even if its supervisor panics or is aborted.
struct Finalize<C: Clock> {
    job: Arc<Job<C>>,
}

impl<C: Clock> Drop for Finalize<C> {
    fn drop(&mut self) {
        let job = &self.job;
        if job.finish(JobStatus::Failed, JobResult::failure(1, "supervisor exited unexpectedly")) {
            tracing::error!(job_id = %job.id(), "supervisor exited before the job finished");
        }
        job.append_event(EventKind::Done, job.done_payload());
        job.close();
    }
}

async fn supervise<C: Clock>(
    job: Arc<Job<C>>,
    connector: Arc<dyn Connector>,
    settings: SpawnerSettings,
) {
    let _finalize = Finalize { job: Arc::clone(&job) };
    run(&job, connector, &settings).await;
    let status = job.status();
    let exit_code = job.result().map(|r| r.exit_code);
    tracing::info!(job_id = %job.id(), %status, ?exit_code, "job finished");
}

async fn run<C: Clock>(job: &Arc<Job<C>>, connector: Arc<dyn Connector>, settings: &SpawnerSettings) {
    let command = connector.build_command(&job.spec().prompt);
    if !job.mark_running() {
        tracing::info!(job_id = %job.id(), "job stopped before launch");
        job.append_event(EventKind::Error, error_payload(STOPPED_BY_REQUEST));
        return;
    }

    let cancel = job.cancel_token();
    let deadline = tokio::time::Instant::now() + settings.default_timeout;

    let (mut child, stdout, stderr) = match launch(&command, job.spec().work_dir.as_deref()) {
        Ok(launched) => launched,
        Err(e) => {
            tracing::error!(job_id = %job.id(), connector = connector.name(), error = %e, "failed to launch job");
            let message = e.to_string();
            job.finish(JobStatus::Failed, JobResult::failure(e.exit_code(), &message));
            job.append_event(EventKind::Error, error_payload(&message));
            return;
        }
    };

    let pid = child.id();
    if !job.set_process_group(pid) {
        // Stopped while launching
        kill_and_reap(&mut child, job).await;
        job.append_event(EventKind::Error, error_payload(STOPPED_BY_REQUEST));
        return;
    }
    tracing::info!(
        job_id = %job.id(),
        connector = connector.name(),
        pid,
        command = %command,
        "job started"
    );

    let mut reader = tokio::spawn(read_output(Arc::clone(job), connector, stdout, stderr));

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(STOPPED_BY_REQUEST.to_string()),
        _ = tokio::time::sleep_until(deadline) => {
            Err(format!("timed out after {}", format_duration(settings.default_timeout)))
        }
        status = child.wait() => Ok(status),
    };

    match waited {
        Err(cause) => {
            kill_and_reap(&mut child, job).await;
            drain_reader(&mut reader, settings.drain_timeout, job).await;
            tracing::info!(job_id = %job.id(), cause = %cause, "job stopped");
            job.finish(JobStatus::Stopped, JobResult::stopped(&cause));
            job.append_event(EventKind::Error, error_payload(&cause));
        }
        Ok(Err(e)) => {
            job.release_process_group();
            reader.abort();
            let message = format!("failed to wait for process: {e}");
            tracing::error!(job_id = %job.id(), error = %e, "wait failed");
            job.finish(JobStatus::Failed, JobResult::failure(1, &message));
            job.append_event(EventKind::Error, error_payload(&message));
        }
        Ok(Ok(status)) => {
            // Background children may still hold the pipes open
            let drained = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                output = drain_reader(&mut reader, settings.drain_timeout, job) => Some(output),
            };
            match drained {
                Some(output) => {
                    job.release_process_group();
                    finish_exited(job, status, output);
                }
                None => {
                    if let Some(pgid) = pid {
                        kill_process_group(job.id(), pgid);
                    }
                    reader.abort();
                    let _ = (&mut reader).await;
                    job.release_process_group();
                    tracing::info!(job_id = %job.id(), "job stopped while draining output");
                    job.finish(JobStatus::Stopped, JobResult::stopped(STOPPED_BY_REQUEST));
                    job.append_event(EventKind::Error, error_payload(&stop_cause(job)));
                }
            }
        }
    }
}

/// Record the outcome of a process that exited on its own.
fn finish_exited<C: Clock>(job: &Job<C>, status: ExitStatus, output: ReadOutcome) {
    if job.is_terminal() {
        // Stopped after the process had already exited
        if job.status() == JobStatus::Stopped {
            job.append_event(EventKind::Error, error_payload(&stop_cause(job)));
        }
        return;
    }
    if status.success() {
        if let Some(e) = output.error {
            let message = format!("failed to read output: {e}");
            job.finish(JobStatus::Failed, JobResult::failure(1, &message));
            job.append_event(EventKind::Error, error_payload(&message));
            return;
        }
        let mut result = JobResult::success();
        if let Some(payload) = output.last_result {
            result = result.with_output(payload);
        }
        job.finish(JobStatus::Completed, result);
        return;
    }

    let code = status.code().or_else(|| status.signal().map(|s| 128 + s)).unwrap_or(1);
    let message = format!("process exited with status {code}");
    tracing::warn!(job_id = %job.id(), exit_code = code, "job process failed");
    job.finish(JobStatus::Failed, JobResult::failure(code, &message));
    job.append_event(EventKind::Error, error_payload(&message));
}

fn stop_cause<C: Clock>(job: &Job<C>) -> String {
    job.result()
        .and_then(|r| r.error_message)
        .unwrap_or_else(|| STOPPED_BY_REQUEST.to_string())
}

fn launch(
    command: &CommandSpec,
    work_dir: Option<&Path>,
) -> Result<(Child, ChildStdout, ChildStderr), LaunchError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);
    if let Some(dir) = work_dir {
        if !dir.is_dir() {
            return Err(LaunchError::WorkDir(dir.to_path_buf()));
        }
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| LaunchError::from_io(&command.program, e))?;
    match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => Ok((child, stdout, stderr)),
        _ => {
            let _ = child.start_kill();
            Err(LaunchError::Pipes)
        }
    }
}

async fn kill_and_reap<C: Clock>(child: &mut Child, job: &Job<C>) {
    if let Some(pid) = child.id() {
        kill_process_group(job.id(), pid);
    }
    if let Err(e) = child.start_kill() {
        tracing::debug!(job_id = %job.id(), error = %e, "kill failed, process already gone");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(job_id = %job.id(), error = %e, "failed to reap job process");
    }
    job.release_process_group();
}

#[derive(Debug, Default)]
struct ReadOutcome {
    /// Payload of the last `result` event
    last_result: Option<Payload>,
    error: Option<io::Error>,
}

async fn read_output<C: Clock>(
    job: Arc<Job<C>>,
    connector: Arc<dyn Connector>,
    stdout: ChildStdout,
    stderr: ChildStderr,
) -> ReadOutcome {
    let mut lines = futures_util::stream::select(
        FramedRead::new(stdout, OutputLineCodec::new()),
        FramedRead::new(stderr, OutputLineCodec::new()),
    );
    let mut outcome = ReadOutcome::default();

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(job_id = %job.id(), error = %e, "failed to read job output");
                outcome.error = Some(e);
                break;
            }
        };
        match connector.parse_line(&line) {
            Ok(Some(parsed)) if parsed.kind == EventKind::Done => {
                tracing::debug!(job_id = %job.id(), "ignoring done event from connector");
            }
            Ok(Some(parsed)) => {
                if parsed.kind == EventKind::Result {
                    outcome.last_result = Some(parsed.payload.clone());
                }
                if !job.append_output(parsed.kind, parsed.payload) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(job_id = %job.id(), error = %e, "skipping malformed output line");
            }
        }
    }
    outcome
}

/// Wait for the reader to hit end of output, aborting it past `timeout`.
async fn drain_reader<C: Clock>(
    reader: &mut JoinHandle<ReadOutcome>,
    timeout: Duration,
    job: &Job<C>,
) -> ReadOutcome {
    match tokio::time::timeout(timeout, &mut *reader).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::warn!(job_id = %job.id(), error = %e, "output reader failed");
            ReadOutcome { last_result: None, error: Some(io::Error::other(e.to_string())) }
        }
        Err(_) => {
            reader.abort();
            tracing::warn!(job_id = %job.id(), "output still open after exit, abandoning reader");
            ReadOutcome::default()
        }
    }
}

fn error_payload(message: &str) -> Payload {
    Payload::json(&serde_json::json!({ "message": message }))
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
