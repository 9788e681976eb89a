// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autopilot-cleanup`: prunes stale state entries, then exits. Takes the
//! config directory as its sole positional argument (the tick driver
//! invokes it this way); falls back to the resolved default when omitted.

use autopilot_daemon::{cleanup, config, logging};
use std::path::PathBuf;

fn main() {
    let config_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(config::config_dir);
    let _guard = logging::init_logging(&config::log_dir(&config_dir));

    match cleanup::run_cleanup(&config_dir) {
        Ok(report) => {
            tracing::info!(removed = report.removed.len(), "cleanup complete");
            std::process::exit(0);
        }
        Err(err) => {
            tracing::error!(error = %err, "cleanup failed");
            std::process::exit(1);
        }
    }
}
