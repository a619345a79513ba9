// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! wrkd — the worker runtime daemon.
//!
//! Background process that discovers tool manifests under a project and a
//! global tools directory, spawns a worker process per tool, and serves
//! both over a single HTTP/WebSocket listener.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod connection;
mod file_watcher;
mod health;
mod http;
mod logging;
mod orchestrator;
mod router;
mod rpc_cache;
mod session_memory;
mod worker;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use config::{Config, ConfigOverrides, LogFormat};
use orchestrator::Orchestrator;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use wrkd_adapters::worker::ProcessWorkerAdapter;

/// wrkd — discovers and runs tool workers, serving them over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "wrkd", version)]
struct Cli {
    /// Path to a TOML config file. Defaults to `$OJ_RPC_CONFIG` or `./oj-rpc.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port the HTTP/WebSocket listener binds to.
    #[arg(long)]
    port: Option<u16>,

    /// Project tools directory (overlay, takes priority over the global one).
    #[arg(long)]
    tools_dir: Option<PathBuf>,

    /// Global tools directory (base layer).
    #[arg(long)]
    global_tools_dir: Option<PathBuf>,

    /// Enable development mode (pretty logs, relaxed limits).
    #[arg(long)]
    dev: bool,
}

impl Cli {
    fn into_overrides(self) -> (Option<PathBuf>, ConfigOverrides) {
        let dev = self.dev.then_some(true);
        (
            self.config,
            ConfigOverrides {
                port: self.port,
                tools_dir: self.tools_dir,
                global_tools_dir: self.global_tools_dir,
                dev,
                log_format: None,
                max_connections: None,
                max_frame_bytes: None,
            },
        )
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (config_path, overrides) = cli.into_overrides();

    let config = match Config::load(config_path.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("wrkd: failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_format = if config.dev { LogFormat::Pretty } else { config.log_format };
    logging::init(log_format);

    info!(port = config.port, tools_dir = %config.tools_dir.display(), "starting wrkd");

    let orchestrator = Orchestrator::new(config, Arc::new(ProcessWorkerAdapter));
    if let Err(err) = orchestrator.start().await {
        error!(%err, "failed to start");
        std::process::exit(1);
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    orchestrator.stop().await;
    info!("wrkd stopped");
    Ok(())
}
