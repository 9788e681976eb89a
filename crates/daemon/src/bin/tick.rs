// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autopilot-tick`: runs a single tick and exits. Invoked on a timer
//! (cron, systemd timer, launchd) rather than looping itself — keeping the
//! process short-lived means a stuck tmux call can't wedge the scheduler
//! past the next invocation.

use autopilot_daemon::{config, logging, tick};

#[tokio::main]
async fn main() {
    let config_dir = config::config_dir();
    let _guard = logging::init_logging(&config::log_dir(&config_dir));

    let report = tick::run_tick(&config_dir).await;
    tracing::info!(
        considered = report.projects_considered,
        attempted = report.sends_attempted,
        succeeded = report.sends_succeeded,
        commands = report.commands_processed,
        aborted = ?report.aborted,
        "tick complete"
    );

    std::process::exit(0);
}
