// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: daily-rotating file appender under the resolved config
//! directory's `logs/` subdirectory, plus a console layer. Filtered by
//! `AUTOPILOT_LOG` (falling back to `RUST_LOG`, then `info`).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. The returned guard must be
/// held for the lifetime of the process — dropping it stops the background
/// flush thread and silently truncates buffered log lines.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, "autopilot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = env_filter();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

fn env_filter() -> EnvFilter {
    std::env::var("AUTOPILOT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
