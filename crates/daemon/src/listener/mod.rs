// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP listener.
//!
//! Job routes live under `/api/v1`; `/health` and `/ready` sit at the root.
//! Handlers share one [`ListenCtx`] and never block: submission returns as
//! soon as the job is admitted and its supervisor is spawned.

mod error;
mod query;
mod remove;
mod run;
mod stream;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use clr_adapters::ConnectorRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::engine::{Registry, Spawner};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub registry: Arc<Registry>,
    pub spawner: Arc<Spawner>,
    pub connectors: ConnectorRegistry,
}

/// All routes, with request logging.
pub fn router(ctx: Arc<ListenCtx>) -> Router {
    let api = Router::new()
        .route("/run", post(run::run))
        .route("/stream/:id", get(stream::stream))
        .route("/process/:id", get(query::process).delete(remove::remove))
        .route("/result/:id", get(query::result))
        .route("/result-data/:id", get(query::result_data))
        .route("/processes", get(query::processes))
        .route("/connectors", get(query::connectors));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(query::health))
        .route("/ready", get(query::ready))
        .layer(middleware::from_fn(log_requests))
        .with_state(ctx)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if path.contains("/stream/") {
        // Streams outlive the response head; only the attach is logged here
        tracing::debug!(%method, %path, status, "stream opened");
    } else {
        tracing::info!(%method, %path, status, latency_ms, "request");
    }
    response
}

/// Accepts HTTP connections until shut down.
pub struct Listener {
    listener: TcpListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(listener: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { listener, ctx }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled, then wait for open connections.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        axum::serve(self.listener, router(self.ctx))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
