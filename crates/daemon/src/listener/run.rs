// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job submission.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use clr_core::JobId;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::ListenCtx;
use crate::engine::JobSpec;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunRequest {
    pub connector: String,
    pub prompt: String,
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunResponse {
    pub process_id: JobId,
}

/// POST /api/v1/run
pub(crate) async fn run(
    State(ctx): State<Arc<ListenCtx>>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RunResponse>), ApiError> {
    let Json(request) = body?;
    if request.connector.trim().is_empty() {
        return Err(ApiError::bad_request("connector is required"));
    }
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("prompt is required"));
    }

    let connector = ctx.connectors.get(&request.connector)?;
    let work_dir = request.work_dir.filter(|d| !d.as_os_str().is_empty());
    let job = ctx.registry.create(JobSpec {
        connector: request.connector,
        prompt: request.prompt,
        work_dir,
    })?;
    let process_id = job.id().clone();
    ctx.spawner.spawn(job, connector)?;

    Ok((StatusCode::ACCEPTED, Json(RunResponse { process_id })))
}
