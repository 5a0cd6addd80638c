// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! clrd: HTTP daemon for running command-line AI tools

use anyhow::Context;
use clap::Parser;
use clr_daemon::lifecycle::{self, init_logging};
use clr_daemon::{Args, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args).context("failed to load configuration")?;
    let _log_guard = init_logging(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), addr = %config.bind_addr(), "starting clrd");
    lifecycle::run(config, lifecycle::shutdown_signal()).await?;
    info!("clrd stopped");
    Ok(())
}
