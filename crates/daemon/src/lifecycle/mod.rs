// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, signal handling, shutdown.

mod logging;
mod startup;

pub use logging::init_logging;
pub use startup::startup;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{Registry, Spawner};
use crate::listener::Listener;

/// Daemon state during operation.
///
/// The listener is returned separately from startup so it can be spawned
/// as its own task.
pub struct DaemonState {
    pub config: Config,
    pub registry: Arc<Registry>,
    pub spawner: Arc<Spawner>,
    /// When the daemon started
    pub start_time: Instant,
    sweeper_cancel: CancellationToken,
    sweeper: JoinHandle<()>,
}

/// Result of daemon startup: the daemon state and its bound listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: Listener,
}

/// What a shutdown did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Jobs moved to `stopped`
    pub stopped: usize,
    /// Whether every supervisor finished within the drain timeout
    pub drained: bool,
}

impl DaemonState {
    /// Stop accepting work, stop every active job, and wait for supervisors.
    ///
    /// Closing the jobs also ends their event streams, which lets the HTTP
    /// server finish its own graceful shutdown afterwards.
    pub async fn shutdown(self) -> ShutdownReport {
        info!(active = self.registry.count(), "shutting down daemon");

        self.spawner.close();
        let stopped = self.registry.stop_all();
        let drain_timeout = self.config.process.drain_timeout;
        let drained = self.spawner.drain(drain_timeout).await;
        if !drained {
            warn!(
                remaining = self.spawner.active(),
                timeout_ms = drain_timeout.as_millis() as u64,
                "supervisors did not finish before drain timeout"
            );
        }

        self.sweeper_cancel.cancel();
        if let Err(e) = self.sweeper.await {
            warn!(error = %e, "sweeper task failed");
        }

        info!(
            stopped,
            drained,
            uptime_secs = self.start_time.elapsed().as_secs(),
            "daemon shutdown complete"
        );
        ShutdownReport { stopped, drained }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the daemon until `signal` resolves or the server fails.
pub async fn run(config: Config, signal: impl Future<Output = ()>) -> Result<(), LifecycleError> {
    let drain_timeout = config.process.drain_timeout;
    let StartupResult { daemon, listener } = startup(&config).await?;

    let server_cancel = CancellationToken::new();
    let mut server = tokio::spawn(listener.run(server_cancel.clone()));

    let finished = tokio::select! {
        _ = signal => {
            info!("shutdown signal received");
            None
        }
        result = &mut server => {
            warn!("server exited before shutdown was requested");
            Some(result)
        }
    };

    daemon.shutdown().await;
    server_cancel.cancel();

    let result = match finished {
        Some(result) => result,
        None => match tokio::time::timeout(drain_timeout, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                warn!("open connections outlived drain timeout");
                server.abort();
                return Ok(());
            }
        },
    };
    match result {
        Ok(served) => served.map_err(LifecycleError::Io),
        Err(e) => Err(LifecycleError::Io(std::io::Error::other(e))),
    }
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
