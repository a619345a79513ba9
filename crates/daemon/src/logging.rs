// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Global `tracing` subscriber installation. Must run before any other
//! component starts so startup itself is logged.

use crate::config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the process-wide subscriber. Pretty output for interactive
/// development, structured JSON lines otherwise.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer().with_target(false)).init();
        }
        LogFormat::Json => {
            registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).init();
        }
    }
}
