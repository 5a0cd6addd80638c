// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-sent event stream of one job: buffered history, then live events
//! until `done`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use clr_core::{Event, EventKind, JobId, Payload, SubscriberId};
use futures_util::Stream;
use serde::Serialize;

use super::error::ApiError;
use super::ListenCtx;
use crate::engine::to_datetime;

/// JSON carried in each frame's `data` field.
#[derive(Debug, Serialize)]
pub(crate) struct WireEvent<'a> {
    pub kind: EventKind,
    pub payload: &'a Payload,
    pub timestamp: DateTime<Utc>,
}

impl<'a> From<&'a Event> for WireEvent<'a> {
    fn from(event: &'a Event) -> Self {
        Self { kind: event.kind, payload: &event.payload, timestamp: to_datetime(event.timestamp_ms) }
    }
}

pub(crate) fn sse_frame(event: &Event) -> SseEvent {
    let frame = SseEvent::default().event(event.kind.to_string());
    match serde_json::to_string(&WireEvent::from(event)) {
        Ok(data) => frame.data(data),
        Err(e) => {
            tracing::warn!(error = %e, kind = %event.kind, "failed to encode event");
            frame.data("{}")
        }
    }
}

/// GET /api/v1/stream/:id
pub(crate) async fn stream(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let job = ctx.registry.get(&JobId::from_string(id))?;
    let (history, mut rx, subscription) = job.attach(SubscriberId::new());
    tracing::debug!(
        job_id = %job.id(),
        subscriber = %subscription.id(),
        replayed = history.len(),
        "stream attached"
    );

    let events = async_stream::stream! {
        // Unsubscribes when the client goes away and the stream is dropped
        let _subscription = subscription;
        let mut finished = false;
        for event in &history {
            yield Ok::<_, Infallible>(sse_frame(event));
            if event.is_done() {
                finished = true;
                break;
            }
        }
        while !finished {
            match rx.recv().await {
                Some(event) => {
                    finished = event.is_done();
                    yield Ok::<_, Infallible>(sse_frame(&event));
                }
                None => finished = true,
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
