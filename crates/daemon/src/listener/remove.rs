// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use clr_core::JobId;
use serde::Serialize;

use super::error::ApiError;
use super::ListenCtx;

#[derive(Debug, Serialize)]
pub(crate) struct Removed {
    pub message: String,
}

/// DELETE /api/v1/process/:id
///
/// Stops the job if it is still active, then forgets it.
pub(crate) async fn remove(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Json<Removed>, ApiError> {
    let id = JobId::from_string(id);
    ctx.registry.stop(&id)?;
    ctx.registry.remove(&id)?;
    tracing::info!(job_id = %id, "process stopped and removed");
    Ok(Json(Removed { message: format!("process {id} stopped and removed") }))
}
