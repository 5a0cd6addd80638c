// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only endpoints: job status, results, listings, and probes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use clr_core::{JobId, JobStatus};
use serde::Serialize;

use super::error::ApiError;
use super::ListenCtx;
use crate::engine::JobSnapshot;

#[derive(Debug, Serialize)]
pub(crate) struct ProcessList {
    pub processes: Vec<JobSnapshot>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConnectorList {
    pub connectors: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct Pending {
    pub status: JobStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Readiness {
    pub status: &'static str,
    pub active: usize,
    pub max_concurrent: usize,
}

/// GET /api/v1/process/:id
pub(crate) async fn process(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let job = ctx.registry.get(&JobId::from_string(id))?;
    Ok(Json(job.status_snapshot()))
}

/// GET /api/v1/result/:id
///
/// 200 with the result once the job is terminal, 202 while it runs.
pub(crate) async fn result(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let job = ctx.registry.get(&JobId::from_string(id))?;
    match job.result() {
        Some(result) => Ok(Json(result).into_response()),
        None => {
            let status = job.status();
            let body = Pending { status, message: format!("process is still {status}") };
            Ok((StatusCode::ACCEPTED, Json(body)).into_response())
        }
    }
}

/// GET /api/v1/result-data/:id
///
/// The last `result` payload verbatim, while cached.
pub(crate) async fn result_data(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = JobId::from_string(id);
    let payload = ctx
        .registry
        .cached_result(&id)
        .ok_or_else(|| ApiError::not_found("result not found or expired"))?;
    if payload.as_json().is_none() {
        tracing::warn!(job_id = %id, len = payload.len(), "cached result is not JSON");
        return Err(ApiError::internal("cached result is not valid JSON"));
    }
    let body = payload.as_bytes().to_vec();
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /api/v1/processes
pub(crate) async fn processes(State(ctx): State<Arc<ListenCtx>>) -> Json<ProcessList> {
    let processes: Vec<JobSnapshot> =
        ctx.registry.list().iter().map(|job| job.status_snapshot()).collect();
    Json(ProcessList { count: processes.len(), processes })
}

/// GET /api/v1/connectors
pub(crate) async fn connectors(State(ctx): State<Arc<ListenCtx>>) -> Json<ConnectorList> {
    let connectors = ctx.connectors.available();
    Json(ConnectorList { count: connectors.len(), connectors })
}

/// GET /health
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// GET /ready
pub(crate) async fn ready(State(ctx): State<Arc<ListenCtx>>) -> Json<Readiness> {
    Json(Readiness {
        status: "ready",
        active: ctx.registry.count(),
        max_concurrent: ctx.registry.settings().max_concurrent,
    })
}
