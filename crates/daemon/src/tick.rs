// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tick driver: one pass of the control loop described across the
//! engine and storage crates. An external timer invokes this roughly every
//! minute; each call is a fresh tick with no state carried in memory across
//! calls — the state file is the sole ground truth.

use crate::config::{self, BusConfig, Config, SchedulerStrategyConfig};
use crate::error::TickError;
use crate::session_scan;
use autopilot_adapters::{send_reply, verify_send, CommandBus, TelegramNotifier, TransportConfig};
use autopilot_core::task::{TaskConfig, TaskOverrides};
use autopilot_core::{Intent, Project, ProjectLifecycle};
use autopilot_engine::done_checker::check_done_conditions;
use autopilot_engine::orchestrator::{self, TaskStates};
use autopilot_engine::scheduler::{self, SchedulingStrategy};
use autopilot_engine::{analyze_intent, discover_sessions, is_last_message_from_user, read_last_assistant_message, reply_generator, SessionMetaCache};
use autopilot_storage::{increment_send_count, GlobalState, HistoryEntry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const MAX_ASSISTANT_MESSAGE_CHARS: usize = 4000;
const LOOP_HASH_PREFIX_CHARS: usize = 500;

#[derive(Debug, Default)]
pub struct TickReport {
    pub projects_considered: usize,
    pub sends_attempted: usize,
    pub sends_succeeded: usize,
    pub commands_processed: usize,
    pub aborted: Option<String>,
}

/// Runs a single tick to completion. Never returns an `Err` — every failure
/// mode is logged (and notified, when a bus is configured) and folded into
/// the returned report. The tick binary always exits `0`.
pub async fn run_tick(config_dir: &Path) -> TickReport {
    match run_tick_inner(config_dir).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "tick aborted");
            let config = config::load_config(&config::config_file_path(config_dir));
            notify_error(&config, "tick aborted", &err.to_string()).await;
            TickReport {
                aborted: Some(err.to_string()),
                ..TickReport::default()
            }
        }
    }
}

async fn run_tick_inner(config_dir: &Path) -> Result<TickReport, TickError> {
    let span = tracing::info_span!("tick", config_dir = %config_dir.display());
    let _enter = span.enter();

    // Step 1: load config and state; stamp timestamps.
    let config = config::load_config(&config::config_file_path(config_dir));
    if config.is_empty() {
        return Err(TickError::ManifestRead {
            path: config::config_file_path(config_dir),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no project_dirs configured"),
        });
    }

    let state_path = config::state_file_path(config_dir);
    let mut state = GlobalState::load(&state_path)?;
    let now = SystemTime::now();
    let now_epoch_secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    state.last_tick_at = Some(chrono::Utc::now());
    if state.started_at.is_none() {
        state.started_at = Some(chrono::Utc::now());
    }

    // Step 2: bounded, non-fatal startup cleanup.
    run_startup_cleanup(config_dir).await;

    // Step 3: verify the transport binary is runnable.
    let transport = TransportConfig::default();
    if !is_executable(Path::new(&transport.tmux_path)) {
        let msg = format!("tmux binary not executable: {}", transport.tmux_path);
        notify_error(&config, "transport unavailable", &msg).await;
        return Err(TickError::TransportUnavailable(msg));
    }

    // Step 4: build the project registry and discover sessions.
    let mut projects = build_project_registry(config_dir, &config);
    tracing::info!(count = projects.len(), "project registry built");

    let sessions_base = session_scan::sessions_base_dir();
    let jsonl_paths = session_scan::discover_jsonl_paths(&sessions_base);
    let project_dirs: Vec<PathBuf> = projects.iter().map(|p| p.dir.clone()).collect();
    let mut meta_cache = SessionMetaCache::new();
    let sessions = discover_sessions(&jsonl_paths, &project_dirs, &mut meta_cache);

    // Step 5: drain inbound commands.
    let mut commands_processed = 0usize;
    if let Some(bus_config) = config.bus.as_ref().filter(|b| b.is_configured()) {
        commands_processed = drain_inbound_commands(bus_config, &mut projects, &mut state, &sessions).await;
    }

    // Step 6: filter & sort via the scheduler.
    let strategy = match config.scheduler.strategy {
        SchedulerStrategyConfig::Priority => SchedulingStrategy::Priority,
        SchedulerStrategyConfig::RoundRobin => SchedulingStrategy::RoundRobin,
    };
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let sessions_for_filter = &sessions;
    let actionable = scheduler::schedule_projects(
        &projects,
        &|dir: &Path| sessions_for_filter.contains_key(dir),
        &mut state,
        strategy,
        config.cooldown,
        config.max_daily_sends,
        &today,
        now_epoch_secs,
    );

    // Step 7: dispatch, bounded by max_sends_per_tick and the global cap.
    let mut report = TickReport {
        projects_considered: actionable.len(),
        commands_processed,
        ..TickReport::default()
    };

    let dispatch_list: Vec<_> = actionable
        .into_iter()
        .take(config.scheduler.max_sends_per_tick as usize)
        .collect();
    let last_index = dispatch_list.len().saturating_sub(1);

    for (index, project) in dispatch_list.into_iter().enumerate() {
        if state.total_daily_sends(&today) >= config.max_daily_sends_total {
            tracing::warn!("global daily send cap reached, stopping dispatch for this tick");
            break;
        }

        report.sends_attempted += 1;
        match dispatch_project(&config, &transport, &project, &sessions, &mut state, &today, now_epoch_secs).await {
            Ok(true) => report.sends_succeeded += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(project = %project.name, error = %err, "project dispatch failed, continuing tick");
                notify_error(&config, &project.name, &err.to_string()).await;
            }
        }

        if index < last_index {
            tokio::time::sleep(Duration::from_secs(config.scheduler.inter_project_delay)).await;
        }
    }

    // Step 9: save state.
    state.save(&state_path)?;

    Ok(report)
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}

async fn run_startup_cleanup(config_dir: &Path) {
    let mut cmd = tokio::process::Command::new("autopilot-cleanup");
    cmd.arg(config_dir);
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::piped());

    let result = tokio::time::timeout(Duration::from_secs(10), cmd.output()).await;
    match result {
        Ok(Ok(output)) if !output.status.success() => {
            tracing::warn!(stderr = %String::from_utf8_lossy(&output.stderr), "startup cleanup exited non-zero");
        }
        Ok(Err(err)) => tracing::warn!(error = %err, "startup cleanup failed to launch"),
        Err(_) => tracing::warn!("startup cleanup timed out"),
        Ok(Ok(_)) => {}
    }
}

#[derive(Debug, Default, Deserialize)]
struct ManifestProjectMeta {
    name: Option<String>,
    dir: Option<PathBuf>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default)]
    overrides: TaskOverrides,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> i32 {
    10
}

#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    project: ManifestProjectMeta,
}

/// Merges projects registered centrally (`<config-dir>/projects/<name>/tasks.yaml`,
/// each carrying its own `project:` metadata block) with `config.project_dirs`
/// entries (whose manifest, if any, lives at `<dir>/.autopilot/tasks.yaml`).
pub fn build_project_registry(config_dir: &Path, config: &Config) -> Vec<Project> {
    let registered = scan_registered_projects(config_dir);
    let mut projects = scheduler::load_all_projects(registered, &config.project_dirs);

    for project in &mut projects {
        if project.task_config.is_none() {
            let manifest_path = project.dir.join(".autopilot").join("tasks.yaml");
            match orchestrator::load_tasks(&manifest_path) {
                Ok(Some(task_config)) => project.task_config = Some(task_config),
                Ok(None) => {}
                Err(err) => tracing::warn!(project = %project.name, error = %err, "failed to load project-local manifest"),
            }
        }
    }

    projects
}

fn scan_registered_projects(config_dir: &Path) -> Vec<Project> {
    let base = config::registered_projects_dir(config_dir);
    let Ok(entries) = std::fs::read_dir(&base) else {
        return Vec::new();
    };

    let mut projects = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let manifest_path = entry.path().join("tasks.yaml");
        if !manifest_path.exists() {
            continue;
        }

        let Ok(raw) = std::fs::read_to_string(&manifest_path) else {
            continue;
        };
        let meta: ManifestFile = match serde_yaml::from_str(&raw) {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(path = %manifest_path.display(), error = %err, "failed to parse project manifest metadata");
                continue;
            }
        };
        let Some(dir) = meta.project.dir else {
            tracing::warn!(path = %manifest_path.display(), "manifest missing project.dir, skipping");
            continue;
        };

        let task_config: Option<TaskConfig> = match orchestrator::load_tasks(&manifest_path) {
            Ok(tc) => tc,
            Err(err) => {
                tracing::warn!(path = %manifest_path.display(), error = %err, "failed to load task list");
                None
            }
        };

        let name = meta
            .project
            .name
            .unwrap_or_else(|| entry.file_name().to_string_lossy().into_owned());

        projects.push(Project {
            name,
            dir,
            enabled: meta.project.enabled,
            priority: meta.project.priority,
            overrides: meta.project.overrides,
            task_config,
            lifecycle: ProjectLifecycle::default(),
        });
    }

    projects
}

async fn drain_inbound_commands(
    bus_config: &BusConfig,
    projects: &mut [Project],
    state: &mut GlobalState,
    sessions: &HashMap<PathBuf, autopilot_core::session::SessionInfo>,
) -> usize {
    let (Some(token), Some(channel_id)) = (bus_config.token.as_deref(), bus_config.channel_id.as_deref()) else {
        return 0;
    };
    let mut bus = CommandBus::new(token, vec![channel_id.to_string()]);
    let commands = bus.poll_commands(0).await;

    for command in &commands {
        let reply = crate::commands::handle_command(command, projects, state, sessions);
        bus.send_reply(&command.chat_id, &reply, Some(command.message_id)).await;
    }

    commands.len()
}

async fn notify_error(config: &Config, context: &str, message: &str) {
    let Some(bus) = config.bus.as_ref().filter(|b| b.is_configured()) else {
        return;
    };
    let (Some(token), Some(channel_id)) = (bus.token.as_deref(), bus.channel_id.as_deref()) else {
        return;
    };
    let notifier = TelegramNotifier::new(token, channel_id);
    let text = autopilot_adapters::notifier::format_error_notification(context, message);
    notifier.notify(&text).await;
}

/// Attempts to dispatch one project's reply. Returns `Ok(true)` on a
/// successful send, `Ok(false)` when nothing was sent (waiting on the user,
/// no new message, etc. — not an error), `Err` for a fatal per-project
/// condition (cyclic dependency).
async fn dispatch_project(
    config: &Config,
    transport: &TransportConfig,
    project: &Project,
    sessions: &HashMap<PathBuf, autopilot_core::session::SessionInfo>,
    state: &mut GlobalState,
    today: &str,
    now_epoch_secs: u64,
) -> Result<bool, TickError> {
    let Some(session) = sessions.get(&project.dir) else {
        return Ok(false);
    };

    let dir_key = project.dir.to_string_lossy().into_owned();

    if is_last_message_from_user(&session.path) {
        let age = session.age(SystemTime::now());
        if age < Duration::from_secs(config.user_wait_timeout) {
            tracing::debug!(project = %project.name, "waiting on user, not resending yet");
            return Ok(false);
        }
        tracing::info!(project = %project.name, "user-wait timeout elapsed, forcing resend");
    }

    let Some(message) = read_last_assistant_message(&session.path, MAX_ASSISTANT_MESSAGE_CHARS) else {
        return Ok(false);
    };

    let prefix: String = message.chars().take(LOOP_HASH_PREFIX_CHARS).collect();
    let hash = format!("{:x}", md5::compute(prefix.as_bytes()));

    let loop_count = {
        let proj_state = state.project_state_mut(&dir_key);
        if proj_state.last_output_hash.as_deref() == Some(hash.as_str()) {
            proj_state.loop_count += 1;
        } else {
            proj_state.loop_count = 1;
            proj_state.last_output_hash = Some(hash);
        }
        proj_state.loop_count
    };

    if loop_count >= config.loop_detection_threshold {
        tracing::warn!(project = %project.name, loop_count, "loop detected");
        mark_project_lifecycle(project, &dir_key, ProjectLifecycle::Error, state);
        notify_error(config, &project.name, "repeated identical output detected, marking project in error").await;
        state.record_history(HistoryEntry {
            timestamp: chrono::Utc::now(),
            action: "loop-detected".to_string(),
            project: Some(project.name.clone()),
            intent: None,
            reply: None,
            success: false,
            error: Some("loop detection threshold reached".to_string()),
        });
        return Ok(false);
    }

    let intent = analyze_intent(Some(&message));
    let (reply, next_task_id) = build_reply(project, &dir_key, state, &message, intent, now_epoch_secs)?;

    let Some(reply) = reply else {
        return Ok(false);
    };

    let sent = send_reply(
        transport,
        &reply,
        &project.name,
        Some(session.session_id.as_str()),
        Some(project.dir.as_path()),
    );

    let failures_at_threshold = {
        let proj_state = state.project_state_mut(&dir_key);
        if sent {
            increment_send_count(proj_state, today, now_epoch_secs);
            proj_state.consecutive_failures = 0;
            if let Some(task_id) = next_task_id {
                proj_state.current_task = Some(task_id);
            }
            None
        } else {
            proj_state.consecutive_failures += 1;
            let failures = proj_state.consecutive_failures;
            (failures >= config.max_consecutive_failures).then_some(failures)
        }
    };

    state.record_history(HistoryEntry {
        timestamp: chrono::Utc::now(),
        action: "send".to_string(),
        project: Some(project.name.clone()),
        intent: Some(intent.to_string()),
        reply: Some(reply.clone()),
        success: sent,
        error: (!sent).then(|| "transport send failed".to_string()),
    });

    if sent {
        scheduler::update_project_send_order(&project.name, state);

        let poll_interval = Duration::from_secs(config.verify_poll_interval);
        let max_wait = Duration::from_secs(config.verify_max_wait);
        let session_path = session.path.clone();
        let verified = tokio::task::spawn_blocking(move || verify_send(&session_path, poll_interval, max_wait))
            .await
            .unwrap_or(false);
        if !verified {
            tracing::debug!(project = %project.name, "send verification did not observe growth before timeout");
        }
    } else if failures_at_threshold.is_some() {
        mark_project_lifecycle(project, &dir_key, ProjectLifecycle::Error, state);
        notify_error(config, &project.name, "consecutive send failures exceeded threshold").await;
    }

    Ok(sent)
}

/// Applies a lifecycle transition both to the scheduler's in-memory active/
/// paused bookkeeping and to the persisted per-project lifecycle string.
fn mark_project_lifecycle(project: &Project, dir_key: &str, new_lifecycle: ProjectLifecycle, state: &mut GlobalState) {
    let mut project_mut = project.clone();
    scheduler::update_project_lifecycle(&mut project_mut, new_lifecycle, state);
    state.project_state_mut(dir_key).lifecycle = new_lifecycle.to_string();
}

/// Builds the reply to send, plus the task id to record as "current" if a
/// new task was dispatched. Task-aware when the project carries a manifest;
/// a plain intent-driven reply otherwise. Errors here are cyclic-dependency
/// failures only — fatal to this project, not the tick.
fn build_reply(
    project: &Project,
    dir_key: &str,
    state: &mut GlobalState,
    message: &str,
    intent: Intent,
    now_epoch_secs: u64,
) -> Result<(Option<String>, Option<autopilot_core::task::TaskId>), TickError> {
    let Some(task_config) = project.task_config.as_ref() else {
        return Ok((Some(reply_generator::generate_reply(intent, message)), None));
    };

    let proj_state = state.project_state_mut(dir_key);
    let task_states: &mut TaskStates = &mut proj_state.task_states;
    let current_task_id = proj_state.current_task.clone();

    if let Some(current_id) = current_task_id.as_ref() {
        if intent != Intent::TaskComplete {
            return Ok((Some(reply_generator::generate_reply(intent, message)), None));
        }

        let Some(current_task) = orchestrator::get_task_by_id(&task_config.tasks, current_id.as_str()) else {
            return Ok((Some(reply_generator::generate_reply(intent, message)), None));
        };

        let done = check_done_conditions(
            current_task.done_when.as_ref(),
            &project.dir,
            task_config.defaults.min_file_size,
        );

        if !done.passed {
            let detail = autopilot_engine::done_checker::format_done_result(&done);
            return Ok((Some(format!("Not yet done:\n{detail}\n\nAddress the above, then report completion again.")), None));
        }

        let result = orchestrator::dispatch_next_task(
            &task_config.tasks,
            task_states,
            now_epoch_secs,
            Some(current_id),
            Some(message),
        )
        .map_err(|err| TickError::ManifestRead {
            path: project.dir.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
        })?;

        return Ok(match result {
            (Some(task), Some(prompt)) => (Some(prompt), Some(task.id.clone())),
            (Some(task), None) => {
                tracing::info!(project = %project.name, task = %task.id, "task blocked pending human review");
                (None, Some(task.id.clone()))
            }
            (None, _) => {
                let done = orchestrator::get_all_completed(&task_config.tasks, task_states);
                if done {
                    (Some(reply_generator::generate_push_reply("all tasks", task_config.tasks.len(), task_config.tasks.len())), None)
                } else {
                    (Some(reply_generator::generate_reply(intent, message)), None)
                }
            }
        });
    }

    let result = orchestrator::dispatch_next_task(&task_config.tasks, task_states, now_epoch_secs, None, None)
        .map_err(|err| TickError::ManifestRead {
            path: project.dir.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
        })?;

    Ok(match result {
        (Some(task), Some(prompt)) => (Some(prompt), Some(task.id.clone())),
        (Some(task), None) => (None, Some(task.id.clone())),
        (None, _) => (Some(reply_generator::generate_reply(intent, message)), None),
    })
}
