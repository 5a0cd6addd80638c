// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clr_core::test_support::strategies::arb_job_status;
use clr_core::{FakeClock, EXIT_CODE_STOPPED};
use proptest::prelude::*;

fn limits() -> JobLimits {
    JobLimits { buffer_size: 4, subscriber_capacity: 8, result_ttl: Duration::from_secs(600) }
}

fn job_with(limits: JobLimits) -> (Arc<Job<FakeClock>>, FakeClock) {
    let clock = FakeClock::new();
    let spec = JobSpec { connector: "claude".to_string(), prompt: "hi".to_string(), work_dir: None };
    (Arc::new(Job::new(JobId::new(), spec, limits, clock.clone())), clock)
}

fn job() -> (Arc<Job<FakeClock>>, FakeClock) {
    job_with(limits())
}

fn output(text: &str) -> Payload {
    Payload::from(text)
}

#[test]
fn new_job_is_pending_without_result() {
    let (job, _) = job();
    assert_eq!(job.status(), JobStatus::Pending);
    assert!(job.result().is_none());
    assert!(job.completed().is_none());
    assert!(job.id().as_str().starts_with("job-"));
}

#[test]
fn append_stamps_and_buffers_events() {
    let (job, clock) = job();
    job.append_event(EventKind::Output, output("a"));
    clock.advance(Duration::from_millis(250));
    job.append_event(EventKind::Output, output("b"));

    let history = job.snapshot();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].payload.to_text(), "a");
    assert_eq!(history[1].timestamp_ms - history[0].timestamp_ms, 250);
}

#[test]
fn buffer_keeps_only_newest_events() {
    let (job, _) = job();
    for i in 0..6 {
        job.append_event(EventKind::Output, output(&i.to_string()));
    }
    let texts: Vec<String> = job.snapshot().iter().map(|e| e.payload.to_text()).collect();
    assert_eq!(texts, vec!["2", "3", "4", "5"]);
}

#[test]
fn subscribers_receive_events_in_order() {
    let (job, _) = job();
    let (mut rx, _guard) = job.subscribe(SubscriberId::new());
    job.append_event(EventKind::Output, output("one"));
    job.append_event(EventKind::Result, output("{}"));

    assert_eq!(rx.try_recv().unwrap().payload.to_text(), "one");
    assert_eq!(rx.try_recv().unwrap().kind, EventKind::Result);
    assert!(rx.try_recv().is_err());
}

#[test]
fn full_subscriber_drops_events_without_blocking() {
    let (job, _) = job_with(JobLimits { subscriber_capacity: 1, ..limits() });
    let (mut rx, _guard) = job.subscribe(SubscriberId::new());
    job.append_event(EventKind::Output, output("kept"));
    job.append_event(EventKind::Output, output("dropped"));

    assert_eq!(rx.try_recv().unwrap().payload.to_text(), "kept");
    assert!(rx.try_recv().is_err());
    assert_eq!(job.subscriber_count(), 1);
    assert_eq!(job.snapshot().len(), 2);
}

#[test]
fn disconnected_subscribers_are_pruned() {
    let (job, _) = job();
    let (rx, guard) = job.subscribe(SubscriberId::new());
    std::mem::forget(guard);
    drop(rx);
    job.append_event(EventKind::Output, output("x"));
    assert_eq!(job.subscriber_count(), 0);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let (job, _) = job();
    let (_rx, guard) = job.subscribe(SubscriberId::new());
    assert_eq!(job.subscriber_count(), 1);
    drop(guard);
    assert_eq!(job.subscriber_count(), 0);
}

#[test]
fn unsubscribe_is_idempotent() {
    let (job, _) = job();
    let sub = SubscriberId::new();
    let (_rx, _guard) = job.subscribe(sub.clone());
    job.unsubscribe(&sub);
    job.unsubscribe(&sub);
    job.close();
    job.unsubscribe(&sub);
    assert_eq!(job.subscriber_count(), 0);
}

#[test]
fn attach_returns_history_then_live_events() {
    let (job, _) = job();
    job.append_event(EventKind::Output, output("before"));
    let (history, mut rx, _guard) = job.attach(SubscriberId::new());
    job.append_event(EventKind::Output, output("after"));

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].payload.to_text(), "before");
    assert_eq!(rx.try_recv().unwrap().payload.to_text(), "after");
}

#[tokio::test]
async fn close_ends_subscriber_streams() {
    let (job, _) = job();
    let (mut rx, _guard) = job.subscribe(SubscriberId::new());
    job.append_event(EventKind::Done, output("{}"));
    job.close();

    assert!(rx.recv().await.unwrap().is_done());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn subscribing_after_close_yields_closed_channel() {
    let (job, _) = job();
    job.close();
    let (mut rx, _guard) = job.subscribe(SubscriberId::new());
    assert!(rx.recv().await.is_none());
    assert_eq!(job.subscriber_count(), 0);
}

#[test]
fn events_after_close_are_ignored() {
    let (job, _) = job();
    job.close();
    job.close();
    assert!(!job.append_event(EventKind::Output, output("late")));
    assert!(job.snapshot().is_empty());
}

#[test]
fn result_cache_lives_for_ttl() {
    let (job, clock) = job();
    assert!(job.cached_result_payload().is_none());

    job.append_event(EventKind::Result, output(r#"{"n":1}"#));
    clock.advance(Duration::from_secs(60));
    job.append_event(EventKind::Result, output(r#"{"n":2}"#));
    assert_eq!(job.cached_result_payload().unwrap().to_text(), r#"{"n":2}"#);

    clock.advance(Duration::from_secs(599));
    assert!(job.cached_result_payload().is_some());
    clock.advance(Duration::from_secs(1));
    assert!(job.cached_result_payload().is_none());
    assert!(job.live_cache().is_none());
}

#[test]
fn output_events_do_not_touch_cache() {
    let (job, _) = job();
    job.append_event(EventKind::Output, output(r#"{"type":"assistant"}"#));
    assert!(job.cached_result_payload().is_none());
}

#[test]
fn mark_running_only_from_pending() {
    let (job, _) = job();
    assert!(job.mark_running());
    assert!(!job.mark_running());
    assert_eq!(job.status(), JobStatus::Running);
}

#[test]
fn finish_sets_result_and_completion_once() {
    let (job, clock) = job();
    job.mark_running();
    clock.advance(Duration::from_secs(3));
    assert!(job.finish(JobStatus::Completed, JobResult::success()));
    let completed = job.completed().unwrap();

    clock.advance(Duration::from_secs(3));
    assert!(!job.finish(JobStatus::Failed, JobResult::failure(1, "late")));
    assert_eq!(job.status(), JobStatus::Completed);
    assert_eq!(job.result(), Some(JobResult::success()));
    assert_eq!(job.completed(), Some(completed));
    assert_eq!(completed.at - job.started().at, Duration::from_secs(3));
}

#[test]
fn stop_running_job_records_stopped_result() {
    let (job, _) = job();
    job.mark_running();
    assert!(job.stop());

    assert_eq!(job.status(), JobStatus::Stopped);
    assert!(job.cancel_token().is_cancelled());
    let result = job.result().unwrap();
    assert_eq!(result.exit_code, EXIT_CODE_STOPPED);
    assert_eq!(result.error_message.as_deref(), Some(STOPPED_BY_REQUEST));
}

#[test]
fn stop_is_idempotent_and_keeps_terminal_state() {
    let (job, _) = job();
    job.finish(JobStatus::Completed, JobResult::success());
    assert!(!job.stop());
    assert!(!job.stop());
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job.cancel_token().is_cancelled());
}

#[test]
fn stop_pending_job_prevents_launch() {
    let (job, _) = job();
    assert!(job.stop());
    assert!(!job.mark_running());
    assert_eq!(job.status(), JobStatus::Stopped);
}

#[test]
fn output_after_stop_is_discarded() {
    let (job, _) = job();
    job.mark_running();
    assert!(job.append_output(EventKind::Output, output("before")));
    job.stop();

    assert!(!job.append_output(EventKind::Output, output("after")));
    assert!(job.append_event(EventKind::Error, output("stopped")));
    let texts: Vec<_> = job.snapshot().iter().map(|e| e.payload.to_text()).collect();
    assert_eq!(texts, vec!["before", "stopped"]);
}

#[test]
fn process_group_is_refused_once_stopped() {
    let (job, _) = job();
    job.mark_running();
    assert!(job.set_process_group(None));
    job.stop();
    assert!(!job.set_process_group(None));
}

#[test]
fn full_history_keeps_newest_events() {
    let (job, _) = job();
    for i in 0..6 {
        job.append_event(EventKind::Output, output(&i.to_string()));
    }
    let texts: Vec<_> = job.snapshot().iter().map(|e| e.payload.to_text()).collect();
    assert_eq!(texts, vec!["2", "3", "4", "5"]);
    assert!(job.inner.lock().history_full);
}

#[test]
fn done_payload_carries_status_and_result() {
    let (job, _) = job();
    job.finish(JobStatus::Failed, JobResult::failure(2, "boom"));
    let value: serde_json::Value = serde_json::from_slice(job.done_payload().as_bytes()).unwrap();
    assert_eq!(value["jobId"], job.id().as_str());
    assert_eq!(value["status"], "failed");
    assert_eq!(value["result"]["exitCode"], 2);
    assert_eq!(value["result"]["error"], "boom");
}

#[test]
fn status_snapshot_serializes_camel_case() {
    let clock = FakeClock::new();
    let spec = JobSpec {
        connector: "claude".to_string(),
        prompt: "hello".to_string(),
        work_dir: Some(PathBuf::from("/tmp")),
    };
    let job = Job::new(JobId::from_string("job-abc"), spec, limits(), clock);
    let value = serde_json::to_value(job.status_snapshot()).unwrap();

    assert_eq!(value["id"], "job-abc");
    assert_eq!(value["workDir"], "/tmp");
    assert_eq!(value["status"], "pending");
    assert_eq!(value["startedAt"], "2023-11-14T22:13:20Z");
    assert!(value.get("completedAt").is_none());
    assert!(value.get("result").is_none());
}

#[test]
fn status_snapshot_includes_completion() {
    let (job, clock) = job();
    clock.advance(Duration::from_millis(1500));
    job.finish(JobStatus::Completed, JobResult::success());
    let snapshot = job.status_snapshot();
    let completed = snapshot.completed_at.unwrap();
    assert_eq!((completed - snapshot.started_at).num_milliseconds(), 1500);
    assert_eq!(snapshot.result, Some(JobResult::success()));
}

proptest! {
    #[test]
    fn terminal_status_is_absorbing(first in arb_job_status(), second in arb_job_status()) {
        let (job, _) = job();
        let entered = match first {
            JobStatus::Pending => false,
            JobStatus::Running => job.mark_running(),
            terminal => job.finish(terminal, JobResult::failure(1, "first")),
        };
        prop_assert_eq!(entered, first != JobStatus::Pending);

        let before = job.status();
        let completed = job.completed();
        if second.is_terminal() {
            job.finish(second, JobResult::failure(2, "second"));
        } else if second == JobStatus::Running {
            job.mark_running();
        }
        if before.is_terminal() {
            prop_assert_eq!(job.status(), before);
            prop_assert_eq!(job.completed(), completed);
        }
        prop_assert_eq!(job.completed().is_some(), job.status().is_terminal());
    }
}
