// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::sync::Arc;
use std::time::Instant;

use clr_adapters::ConnectorRegistry;
use clr_core::SystemClock;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{Registry, Spawner};
use crate::listener::{ListenCtx, Listener};

use super::{DaemonState, LifecycleError, StartupResult};

/// Build the engine, bind the listen address, and start the sweeper.
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    let start_time = Instant::now();

    // 1. Connectors
    let connectors = ConnectorRegistry::from_settings(&config.connectors);
    let available = connectors.available();
    for name in connectors.names() {
        if !available.contains(&name) {
            warn!(connector = %name, "connector is configured but unavailable");
        }
    }
    info!(connectors = ?available, "connectors loaded");

    // 2. Bind before starting any background work so a taken port fails fast
    let addr = config.bind_addr();
    let tcp = TcpListener::bind(&addr)
        .await
        .map_err(|source| LifecycleError::Bind { addr: addr.clone(), source })?;

    // 3. Engine
    let registry = Arc::new(Registry::new(config.registry_settings(), SystemClock));
    let spawner = Arc::new(Spawner::new(config.spawner_settings()));
    let sweeper_cancel = CancellationToken::new();
    let sweeper = registry.spawn_sweeper(sweeper_cancel.clone());

    let ctx = Arc::new(ListenCtx {
        registry: Arc::clone(&registry),
        spawner: Arc::clone(&spawner),
        connectors,
    });
    let listener = Listener::new(tcp, ctx);
    info!(
        addr = %listener.local_addr()?,
        max_concurrent = config.process.max_concurrent,
        default_timeout_secs = config.process.default_timeout.as_secs(),
        "daemon listening"
    );

    let daemon = DaemonState {
        config: config.clone(),
        registry,
        spawner,
        start_time,
        sweeper_cancel,
        sweeper,
    };
    Ok(StartupResult { daemon, listener })
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
