// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `autopilot`: the operator-facing entrypoint. Wraps the tick driver and
//! cleanup utility for manual/cron invocation, and exposes the same
//! project commands the Telegram bus accepts, for use from a terminal.

mod color;
mod exit_error;

use autopilot_adapters::Command;
use autopilot_core::session::SessionInfo;
use autopilot_daemon::{cleanup, commands, config, session_scan, tick};
use autopilot_storage::GlobalState;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use exit_error::ExitError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "autopilot", version, about = "Multi-project autopilot control")]
struct Cli {
    /// Overrides the resolved config directory (`AUTOPILOT_CONFIG_DIR` by default).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Run a single tick and exit.
    Tick,
    /// Prune state entries for projects no longer registered anywhere.
    Cleanup,
    /// Show the dashboard, or one project's detail card.
    Status { project: Option<String> },
    /// Show one project's task progress.
    Tasks { project: String },
    /// Pause a project (or every running project, if none named).
    Pause { project: Option<String> },
    /// Resume a paused project (or every paused project, if none named).
    Resume { project: Option<String> },
    /// Mark the current task complete without checking its done conditions.
    Skip { project: String },
    /// Approve the task currently blocked on human review.
    Approve { project: String },
    /// Clear consecutive failures and re-dispatch the current task.
    Retry { project: String },
    /// Show recent send history, optionally filtered to one project.
    Log { project: Option<String> },
}

#[tokio::main]
async fn main() {
    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let config_dir = cli.config_dir.unwrap_or_else(config::config_dir);

    let result = run(cli.command, &config_dir).await;
    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(err.code);
    }
}

async fn run(action: Action, config_dir: &Path) -> Result<(), ExitError> {
    match action {
        Action::Tick => {
            let report = tick::run_tick(config_dir).await;
            if let Some(reason) = report.aborted {
                return Err(ExitError::new(1, format!("tick aborted: {reason}")));
            }
            println!(
                "considered={} attempted={} succeeded={} commands={}",
                report.projects_considered, report.sends_attempted, report.sends_succeeded, report.commands_processed
            );
            Ok(())
        }
        Action::Cleanup => {
            let report = cleanup::run_cleanup(config_dir)?;
            println!("removed {} stale project(s)", report.removed.len());
            Ok(())
        }
        Action::Status { project } => run_project_command("status", project, config_dir).await,
        Action::Tasks { project } => run_project_command("tasks", Some(project), config_dir).await,
        Action::Pause { project } => run_project_command("pause", project, config_dir).await,
        Action::Resume { project } => run_project_command("resume", project, config_dir).await,
        Action::Skip { project } => run_project_command("skip", Some(project), config_dir).await,
        Action::Approve { project } => run_project_command("approve", Some(project), config_dir).await,
        Action::Retry { project } => run_project_command("retry", Some(project), config_dir).await,
        Action::Log { project } => run_project_command("log", project, config_dir).await,
    }
}

/// Routes a command through the same handler the Telegram bus uses
/// (`autopilot_daemon::commands::handle_command`), against freshly loaded
/// state and project registry, persisting any mutation it made.
async fn run_project_command(name: &str, project: Option<String>, config_dir: &Path) -> Result<(), ExitError> {
    let config = config::load_config(&config::config_file_path(config_dir));
    let mut projects = tick::build_project_registry(config_dir, &config);
    let state_path = config::state_file_path(config_dir);
    let mut state = GlobalState::load(&state_path)?;
    let sessions = discover_sessions_for_display(&projects);

    let command = Command {
        name: name.to_string(),
        project_name: project,
        args: Vec::new(),
        chat_id: "cli".to_string(),
        message_id: 0,
        from_user: "cli".to_string(),
    };

    let reply = commands::handle_command(&command, &mut projects, &mut state, &sessions);
    println!("{reply}");

    state.save(&state_path)?;
    Ok(())
}

fn discover_sessions_for_display(projects: &[autopilot_core::Project]) -> HashMap<PathBuf, SessionInfo> {
    let sessions_base = session_scan::sessions_base_dir();
    let jsonl_paths = session_scan::discover_jsonl_paths(&sessions_base);
    let project_dirs: Vec<PathBuf> = projects.iter().map(|p| p.dir.clone()).collect();
    let mut cache = autopilot_engine::SessionMetaCache::new();
    autopilot_engine::discover_sessions(&jsonl_paths, &project_dirs, &mut cache)
}
