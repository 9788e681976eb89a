// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the eight operator commands the bus adapter parses:
//! `status`, `pause`, `resume`, `skip`, `approve`, `retry`, `tasks`, `log`.
//! Each returns the reply text to send back; failures are reported in the
//! text rather than as an `Err` — a bad `@project` selector isn't a tick
//! error, it's operator feedback.

use autopilot_adapters::Command;
use autopilot_core::session::SessionInfo;
use autopilot_core::task_state::TaskStatus;
use autopilot_core::{Project, ProjectLifecycle};
use autopilot_engine::orchestrator::{approve_task, format_task_progress, mark_task_complete, mark_task_running};
use autopilot_engine::scheduler::update_project_lifecycle;
use autopilot_storage::GlobalState;
use std::collections::HashMap;
use std::path::PathBuf;

fn find_project_index(projects: &[Project], name: &str) -> Option<usize> {
    let wanted = name.to_lowercase();
    projects
        .iter()
        .position(|p| p.name.to_lowercase() == wanted)
        .or_else(|| projects.iter().position(|p| p.name.to_lowercase().starts_with(&wanted)))
}

pub fn handle_command(
    command: &Command,
    projects: &mut [Project],
    state: &mut GlobalState,
    sessions: &HashMap<PathBuf, SessionInfo>,
) -> String {
    match command.name.as_str() {
        "status" => handle_status(command, projects, state, sessions),
        "pause" => handle_pause(command, projects, state),
        "resume" => handle_resume(command, projects, state),
        "skip" => handle_skip(command, projects, state),
        "approve" => handle_approve(command, projects, state),
        "retry" => handle_retry(command, projects, state),
        "tasks" => handle_tasks(command, projects, state),
        "log" => handle_log(command, state),
        other => format!("\u{274c} unknown command: /{other}"),
    }
}

fn handle_status(
    command: &Command,
    projects: &[Project],
    state: &GlobalState,
    sessions: &HashMap<PathBuf, SessionInfo>,
) -> String {
    let Some(name) = command.project_name.as_deref() else {
        return format_dashboard(projects, state, sessions);
    };

    let Some(idx) = find_project_index(projects, name) else {
        return format!("\u{274c} project not found: {name}");
    };
    let project = &projects[idx];
    let dir_key = project.dir.to_string_lossy().into_owned();
    let proj_state = state.projects.get(&dir_key).cloned().unwrap_or_default();

    let mut lines = vec![
        format!("\u{1f4ca} {}", project.name),
        String::new(),
        format!("status: {}", project.lifecycle),
        format!("priority: {}", project.priority),
        format!("dir: {}", project.dir.display()),
    ];

    if let Some(task) = proj_state.current_task.as_ref() {
        lines.push(format!("current task: {task}"));
    }
    if let Some(task_config) = project.task_config.as_ref() {
        let total = task_config.tasks.len();
        let completed = proj_state
            .task_states
            .values()
            .filter(|s| s.status == TaskStatus::Completed)
            .count();
        lines.push(format!("task progress: {completed}/{total}"));
    }
    lines.push(String::new());
    lines.push(format!("sends today: {}", proj_state.daily_sends));
    lines.push(format!("consecutive failures: {}", proj_state.consecutive_failures));
    if let Some(last) = proj_state.last_send_at {
        lines.push(format!("last send at: {last}"));
    }

    lines.join("\n")
}

fn handle_pause(command: &Command, projects: &mut [Project], state: &mut GlobalState) -> String {
    if let Some(name) = command.project_name.as_deref() {
        let Some(idx) = find_project_index(projects, name) else {
            return format!("\u{274c} project not found: {name}");
        };
        if projects[idx].lifecycle == ProjectLifecycle::Paused {
            return format!("\u{26a0} project {} is already paused", projects[idx].name);
        }
        update_project_lifecycle(&mut projects[idx], ProjectLifecycle::Paused, state);
        return format!("\u{23f8} paused project: {}", projects[idx].name);
    }

    let mut paused = Vec::new();
    for project in projects.iter_mut() {
        if matches!(project.lifecycle, ProjectLifecycle::Enabled | ProjectLifecycle::Running) {
            update_project_lifecycle(project, ProjectLifecycle::Paused, state);
            paused.push(project.name.clone());
        }
    }
    if paused.is_empty() {
        "\u{26a0} no projects to pause".to_string()
    } else {
        format!("\u{23f8} paused {} project(s): {}", paused.len(), paused.join(", "))
    }
}

fn handle_resume(command: &Command, projects: &mut [Project], state: &mut GlobalState) -> String {
    if let Some(name) = command.project_name.as_deref() {
        let Some(idx) = find_project_index(projects, name) else {
            return format!("\u{274c} project not found: {name}");
        };
        if projects[idx].lifecycle != ProjectLifecycle::Paused {
            return format!("\u{26a0} project {} is not paused", projects[idx].name);
        }
        update_project_lifecycle(&mut projects[idx], ProjectLifecycle::Running, state);
        return format!("\u{25b6} resumed project: {}", projects[idx].name);
    }

    let mut resumed = Vec::new();
    for project in projects.iter_mut() {
        if project.lifecycle == ProjectLifecycle::Paused {
            update_project_lifecycle(project, ProjectLifecycle::Running, state);
            resumed.push(project.name.clone());
        }
    }
    if resumed.is_empty() {
        "\u{26a0} no projects to resume".to_string()
    } else {
        format!("\u{25b6} resumed {} project(s): {}", resumed.len(), resumed.join(", "))
    }
}

fn handle_skip(command: &Command, projects: &[Project], state: &mut GlobalState) -> String {
    let Some(name) = command.project_name.as_deref() else {
        return "\u{274c} specify a project: /skip @project".to_string();
    };
    let Some(idx) = find_project_index(projects, name) else {
        return format!("\u{274c} project not found: {name}");
    };
    let project = &projects[idx];
    let dir_key = project.dir.to_string_lossy().into_owned();
    let proj_state = state.project_state_mut(&dir_key);

    let Some(task_id) = proj_state.current_task.clone() else {
        return format!("\u{26a0} project {} has no task in progress", project.name);
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    mark_task_complete(&task_id, &mut proj_state.task_states, now, Some("skipped by operator"));
    proj_state.current_task = None;

    format!("\u{23ed} skipped task: {task_id}")
}

fn handle_approve(command: &Command, projects: &[Project], state: &mut GlobalState) -> String {
    let Some(name) = command.project_name.as_deref() else {
        return "\u{274c} specify a project: /approve @project".to_string();
    };
    let Some(idx) = find_project_index(projects, name) else {
        return format!("\u{274c} project not found: {name}");
    };
    let project = &projects[idx];
    let dir_key = project.dir.to_string_lossy().into_owned();
    let proj_state = state.project_state_mut(&dir_key);

    let blocked = proj_state
        .task_states
        .iter()
        .find(|(_, s)| s.status == TaskStatus::Blocked)
        .map(|(id, _)| id.clone());

    let Some(task_id) = blocked else {
        return format!("\u{26a0} project {} has no task awaiting review", project.name);
    };

    if approve_task(&task_id, &mut proj_state.task_states) {
        format!("\u{2705} approved task: {task_id}")
    } else {
        format!("\u{274c} failed to approve task: {task_id}")
    }
}

fn handle_retry(command: &Command, projects: &[Project], state: &mut GlobalState) -> String {
    let Some(name) = command.project_name.as_deref() else {
        return "\u{274c} specify a project: /retry @project".to_string();
    };
    let Some(idx) = find_project_index(projects, name) else {
        return format!("\u{274c} project not found: {name}");
    };
    let project = &projects[idx];
    let dir_key = project.dir.to_string_lossy().into_owned();
    let proj_state = state.project_state_mut(&dir_key);

    let Some(task_id) = proj_state.current_task.clone() else {
        return format!("\u{26a0} project {} has no task in progress", project.name);
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    proj_state.consecutive_failures = 0;
    mark_task_running(&task_id, &mut proj_state.task_states, now);

    format!("\u{1f504} reset task {task_id}, will retry next tick")
}

fn handle_tasks(command: &Command, projects: &[Project], state: &GlobalState) -> String {
    let Some(name) = command.project_name.as_deref() else {
        return "\u{274c} specify a project: /tasks @project".to_string();
    };
    let Some(idx) = find_project_index(projects, name) else {
        return format!("\u{274c} project not found: {name}");
    };
    let project = &projects[idx];
    let Some(task_config) = project.task_config.as_ref().filter(|tc| !tc.tasks.is_empty()) else {
        return format!("\u{26a0} project {} has no configured tasks", project.name);
    };

    let dir_key = project.dir.to_string_lossy().into_owned();
    let proj_state = state.projects.get(&dir_key).cloned().unwrap_or_default();
    let progress = format_task_progress(&task_config.tasks, &proj_state.task_states);

    format!("\u{1f4cb} {} tasks\n\n{progress}", project.name)
}

fn handle_log(command: &Command, state: &GlobalState) -> String {
    let filtered: Vec<_> = state
        .history
        .iter()
        .filter(|entry| {
            command
                .project_name
                .as_deref()
                .map(|name| entry.project.as_deref() == Some(name))
                .unwrap_or(true)
        })
        .collect();

    let recent: Vec<_> = filtered.iter().rev().take(10).collect();
    if recent.is_empty() {
        return "\u{1f4dd} no history entries".to_string();
    }

    let mut lines = vec!["\u{1f4dd} recent history".to_string(), String::new()];
    for entry in recent {
        let icon = if entry.success { "\u{2705}" } else { "\u{274c}" };
        let ts = entry.timestamp.format("%Y-%m-%dT%H:%M:%S");
        let project = entry.project.as_deref().unwrap_or("-");
        lines.push(format!("{icon} [{ts}] {} - {project}", entry.action));
        if let Some(error) = entry.error.as_deref() {
            let truncated: String = error.chars().take(50).collect();
            lines.push(format!("   error: {truncated}"));
        }
    }

    lines.join("\n")
}

fn project_icon(project: &Project, sessions: &HashMap<PathBuf, SessionInfo>) -> &'static str {
    match project.lifecycle {
        ProjectLifecycle::Paused => "\u{23f8}",
        ProjectLifecycle::Completed => "\u{2705}",
        ProjectLifecycle::Error => "\u{274c}",
        _ if sessions.contains_key(&project.dir) => "\u{1f7e2}",
        _ => "\u{1f7e1}",
    }
}

pub fn format_dashboard(projects: &[Project], state: &GlobalState, sessions: &HashMap<PathBuf, SessionInfo>) -> String {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let mut lines = vec!["\u{1f4ca} Autopilot Dashboard".to_string(), String::new()];

    for project in projects {
        let dir_key = project.dir.to_string_lossy().into_owned();
        let proj_state = state.projects.get(&dir_key).cloned().unwrap_or_default();
        let icon = project_icon(project, sessions);

        let task_info = match project.task_config.as_ref().filter(|tc| !tc.tasks.is_empty()) {
            Some(task_config) => {
                let total = task_config.tasks.len();
                let completed = proj_state
                    .task_states
                    .values()
                    .filter(|s| s.status == TaskStatus::Completed)
                    .count();
                let filled = if total > 0 { completed * 18 / total } else { 0 };
                let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(18 - filled);
                format!(" {bar} ({completed}/{total})")
            }
            None => String::new(),
        };

        lines.push(format!("{icon} {}{task_info}", project.name));
    }

    lines.push(String::new());
    lines.push(format!("total sends today: {}", state.total_daily_sends(&today)));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::task::TaskConfig;

    fn command(name: &str, project: Option<&str>) -> Command {
        Command {
            name: name.to_string(),
            project_name: project.map(str::to_string),
            args: Vec::new(),
            chat_id: "1".to_string(),
            message_id: 1,
            from_user: "tester".to_string(),
        }
    }

    #[test]
    fn pause_unknown_project_reports_not_found() {
        let mut projects = vec![Project::minimal("alpha", "/a".into())];
        let mut state = GlobalState::default();
        let reply = handle_command(&command("pause", Some("nope")), &mut projects, &mut state, &HashMap::new());
        assert!(reply.contains("not found"));
    }

    #[test]
    fn pause_then_resume_round_trips_lifecycle() {
        let mut projects = vec![Project::minimal("alpha", "/a".into())];
        let mut state = GlobalState::default();
        handle_command(&command("pause", Some("alpha")), &mut projects, &mut state, &HashMap::new());
        assert_eq!(projects[0].lifecycle, ProjectLifecycle::Paused);
        handle_command(&command("resume", Some("alpha")), &mut projects, &mut state, &HashMap::new());
        assert_eq!(projects[0].lifecycle, ProjectLifecycle::Running);
    }

    #[test]
    fn tasks_without_manifest_reports_warning() {
        let projects = vec![Project::minimal("alpha", "/a".into())];
        let state = GlobalState::default();
        let reply = handle_tasks(&command("tasks", Some("alpha")), &projects, &state);
        assert!(reply.contains("no configured tasks"));
    }

    #[test]
    fn log_filters_by_project() {
        let mut state = GlobalState::default();
        state.record_history(autopilot_storage::HistoryEntry {
            timestamp: chrono::Utc::now(),
            action: "send".to_string(),
            project: Some("alpha".to_string()),
            intent: None,
            reply: None,
            success: true,
            error: None,
        });
        state.record_history(autopilot_storage::HistoryEntry {
            timestamp: chrono::Utc::now(),
            action: "send".to_string(),
            project: Some("beta".to_string()),
            intent: None,
            reply: None,
            success: true,
            error: None,
        });

        let reply = handle_log(&command("log", Some("alpha")), &state);
        assert!(reply.contains("alpha"));
        assert!(!reply.contains("beta"));
    }

    #[test]
    fn dashboard_includes_every_project() {
        let projects = vec![
            Project::minimal("alpha", "/a".into()),
            {
                let mut p = Project::minimal("beta", "/b".into());
                p.lifecycle = ProjectLifecycle::Paused;
                p
            },
        ];
        let state = GlobalState::default();
        let dashboard = format_dashboard(&projects, &state, &HashMap::new());
        assert!(dashboard.contains("alpha"));
        assert!(dashboard.contains("beta"));
    }

    #[test]
    fn status_reports_task_progress_when_configured() {
        let mut project = Project::minimal("alpha", "/a".into());
        project.task_config = Some(TaskConfig::default());
        let projects = vec![project];
        let state = GlobalState::default();
        let reply = handle_status(&command("status", Some("alpha")), &projects, &state, &HashMap::new());
        assert!(reply.contains("task progress"));
    }

    #[yare::parameterized(
        paused = { ProjectLifecycle::Paused, false, "\u{23f8}" },
        completed = { ProjectLifecycle::Completed, false, "\u{2705}" },
        error = { ProjectLifecycle::Error, true, "\u{274c}" },
        enabled_with_session = { ProjectLifecycle::Enabled, true, "\u{1f7e2}" },
        enabled_without_session = { ProjectLifecycle::Enabled, false, "\u{1f7e1}" },
    )]
    fn project_icon_reflects_lifecycle_and_session_presence(
        lifecycle: ProjectLifecycle,
        has_session: bool,
        expected: &str,
    ) {
        let mut project = Project::minimal("alpha", PathBuf::from("/a"));
        project.lifecycle = lifecycle;
        let mut sessions = HashMap::new();
        if has_session {
            sessions.insert(
                project.dir.clone(),
                SessionInfo {
                    path: project.dir.join("session.jsonl"),
                    cwd: project.dir.clone(),
                    mtime: std::time::SystemTime::now(),
                    file_size: 10,
                    session_id: "s1".to_string(),
                },
            );
        }
        assert_eq!(project_icon(&project, &sessions), expected);
    }
}
