// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue management: dependency-ordered dispatch, completion marking,
//! and the human-review gate. Operates purely over in-memory `TaskConfig`
//! and `task_states`; persistence is the caller's job.

use crate::error::OrchestratorError;
use autopilot_core::task::{Task, TaskConfig, TaskId};
use autopilot_core::task_state::{TaskStateInfo, TaskStatus};
use std::collections::HashMap;
use std::path::Path;

pub type TaskStates = HashMap<TaskId, TaskStateInfo>;

/// Parses a project's `tasks.yaml` manifest. Returns `Ok(None)` for a
/// missing or empty file — that's a project running in schedule-only mode,
/// not an error.
pub fn load_tasks(path: &Path) -> Result<Option<TaskConfig>, OrchestratorError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|source| OrchestratorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let config: TaskConfig =
        serde_yaml::from_str(&raw).map_err(|source| OrchestratorError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(config))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// DFS three-coloring cycle detection. Returns the cycle as an ordered list
/// of task ids (the repeated id first and last) if one exists.
pub fn detect_cyclic_dependencies(tasks: &[Task]) -> Option<Vec<TaskId>> {
    let task_map: HashMap<&TaskId, &Task> = tasks.iter().map(|t| (&t.id, t)).collect();
    let mut color: HashMap<TaskId, Color> =
        tasks.iter().map(|t| (t.id.clone(), Color::White)).collect();
    let mut path: Vec<TaskId> = Vec::new();

    fn dfs(
        id: &TaskId,
        task_map: &HashMap<&TaskId, &Task>,
        color: &mut HashMap<TaskId, Color>,
        path: &mut Vec<TaskId>,
    ) -> Option<Vec<TaskId>> {
        let Some(task) = task_map.get(id) else {
            return None;
        };

        match color.get(id) {
            Some(Color::Gray) => {
                let start = path.iter().position(|p| p == id)?;
                let mut cycle = path[start..].to_vec();
                cycle.push(id.clone());
                return Some(cycle);
            }
            Some(Color::Black) => return None,
            _ => {}
        }

        color.insert(id.clone(), Color::Gray);
        path.push(id.clone());

        for dep in &task.depends_on {
            if let Some(cycle) = dfs(dep, task_map, color, path) {
                return Some(cycle);
            }
        }

        path.pop();
        color.insert(id.clone(), Color::Black);
        None
    }

    for task in tasks {
        if color.get(&task.id) == Some(&Color::White) {
            if let Some(cycle) = dfs(&task.id, &task_map, &mut color, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Tasks still `Pending` whose dependencies have all reached `Completed`.
/// Inserts a fresh `Pending` record for any task with no existing state.
pub fn get_ready_tasks<'a>(tasks: &'a [Task], task_states: &mut TaskStates) -> Vec<&'a Task> {
    let mut ready = Vec::new();

    for task in tasks {
        task_states
            .entry(task.id.clone())
            .or_insert_with(TaskStateInfo::default);

        if task_states[&task.id].status != TaskStatus::Pending {
            continue;
        }

        let deps_met = task.depends_on.iter().all(|dep_id| {
            task_states
                .get(dep_id)
                .map(|s| s.status == TaskStatus::Completed)
                .unwrap_or(false)
        });

        if deps_met {
            ready.push(task);
        }
    }

    ready
}

/// Assembles the prompt sent to the agent: a progress header, a digest of
/// completed upstream dependencies' summaries, then the task's own prompt.
pub fn build_prompt(task: &Task, task_states: &TaskStates, tasks: &[Task]) -> String {
    let mut parts = Vec::new();

    let completed_count = task_states
        .values()
        .filter(|s| s.status == TaskStatus::Completed)
        .count();
    parts.push(format!(
        "## Progress: {completed_count}/{} tasks completed\n",
        tasks.len()
    ));

    let mut context_items = Vec::new();
    for dep_id in &task.depends_on {
        if let Some(summary) = task_states
            .get(dep_id)
            .and_then(|s| s.completion_summary.as_deref())
        {
            let dep_name = tasks
                .iter()
                .find(|t| &t.id == dep_id)
                .map(|t| t.name.as_str())
                .unwrap_or(dep_id.as_str());
            context_items.push(format!("- {dep_name}: {summary}"));
        }
    }
    if !context_items.is_empty() {
        parts.push("## Completed prerequisite work\n".to_string());
        parts.push(context_items.join("\n"));
        parts.push(String::new());
    }

    parts.push(format!("## Current task: {}\n", task.name));
    parts.push(task.prompt.clone());

    parts.join("\n")
}

/// Dispatches the next ready task (marking `current_task_id` complete first
/// if given). Returns `(task, prompt)`; a review-gated task comes back with
/// `prompt = None` since it's parked in `Blocked` rather than sent.
pub fn dispatch_next_task<'a>(
    tasks: &'a [Task],
    task_states: &mut TaskStates,
    now_epoch_secs: u64,
    current_task_id: Option<&TaskId>,
    codex_summary: Option<&str>,
) -> Result<(Option<&'a Task>, Option<String>), OrchestratorError> {
    if let Some(cycle) = detect_cyclic_dependencies(tasks) {
        let cycle_str = cycle
            .iter()
            .map(TaskId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(OrchestratorError::CyclicDependency(cycle_str));
    }

    if let Some(id) = current_task_id {
        mark_task_complete(id, task_states, now_epoch_secs, codex_summary);
    }

    let ready = get_ready_tasks(tasks, task_states);
    let Some(next_task) = ready.into_iter().next() else {
        return Ok((None, None));
    };

    if next_task.requires_human_review {
        let state = task_states.entry(next_task.id.clone()).or_default();
        state.status = TaskStatus::Blocked;
        return Ok((Some(next_task), None));
    }

    let prompt = build_prompt(next_task, task_states, tasks);

    let state = task_states.entry(next_task.id.clone()).or_default();
    state.status = TaskStatus::Running;
    state.started_at = Some(now_epoch_secs);
    state.sends += 1;
    state.last_send_at = Some(now_epoch_secs);

    Ok((Some(next_task), Some(prompt)))
}

pub fn mark_task_complete(
    task_id: &TaskId,
    task_states: &mut TaskStates,
    now_epoch_secs: u64,
    codex_summary: Option<&str>,
) {
    let state = task_states.entry(task_id.clone()).or_default();
    state.status = TaskStatus::Completed;
    state.completed_at = Some(now_epoch_secs);
    if let Some(summary) = codex_summary {
        state.completion_summary = Some(summary.to_string());
    }
}

/// Marks a task `Running`, stamping `started_at` only if it was unset — the
/// `/retry` command path reuses this so a retry doesn't reset the clock a
/// dispatch already started.
pub fn mark_task_running(task_id: &TaskId, task_states: &mut TaskStates, now_epoch_secs: u64) {
    let state = task_states.entry(task_id.clone()).or_default();
    state.status = TaskStatus::Running;
    if state.started_at.is_none() {
        state.started_at = Some(now_epoch_secs);
    }
    state.sends += 1;
    state.last_send_at = Some(now_epoch_secs);
}

/// A failed completion check sends the task back to `Running` so the agent
/// keeps iterating rather than dead-ending in `Failed`.
pub fn mark_task_failed(task_id: &TaskId, task_states: &mut TaskStates) {
    let state = task_states.entry(task_id.clone()).or_default();
    state.status = TaskStatus::Running;
}

/// Operator approval for a `Blocked` task: returns it to `Pending` so the
/// next dispatch considers it normally. `false` if it wasn't blocked.
pub fn approve_task(task_id: &TaskId, task_states: &mut TaskStates) -> bool {
    match task_states.get_mut(task_id) {
        Some(state) if state.status == TaskStatus::Blocked => {
            state.status = TaskStatus::Pending;
            true
        }
        _ => false,
    }
}

pub fn get_task_by_id<'a>(tasks: &'a [Task], task_id: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.id.as_str() == task_id)
}

pub fn get_all_completed(tasks: &[Task], task_states: &TaskStates) -> bool {
    tasks.iter().all(|t| {
        task_states
            .get(&t.id)
            .map(|s| s.status == TaskStatus::Completed)
            .unwrap_or(false)
    })
}

fn status_emoji(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "⏳",
        TaskStatus::Ready => "🔜",
        TaskStatus::Running => "🔄",
        TaskStatus::Verifying => "🔍",
        TaskStatus::Completed => "✅",
        TaskStatus::Failed => "❌",
        TaskStatus::Blocked => "⏸",
    }
}

/// A human-readable progress report: a 20-cell bar plus one line per task.
pub fn format_task_progress(tasks: &[Task], task_states: &TaskStates) -> String {
    let mut lines = Vec::new();
    let mut completed = 0usize;

    for task in tasks {
        let status = task_states
            .get(&task.id)
            .map(|s| s.status)
            .unwrap_or_default();
        if status == TaskStatus::Completed {
            completed += 1;
        }
        lines.push(format!("{} {} [{status}]", status_emoji(status), task.name));
    }

    let total = tasks.len();
    let pct = if total > 0 { completed * 100 / total } else { 0 };
    let filled = if total > 0 { completed * 20 / total } else { 0 };
    let bar: String = "█".repeat(filled) + &"░".repeat(20 - filled);

    format!("Progress: {bar} {pct}% ({completed}/{total})\n\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::test_support::{cyclic_config, linear_chain_config};

    #[test]
    fn linear_chain_has_no_cycle() {
        let config = linear_chain_config();
        assert!(detect_cyclic_dependencies(&config.tasks).is_none());
    }

    #[test]
    fn mutual_dependency_is_cyclic() {
        let config = cyclic_config();
        let cycle = detect_cyclic_dependencies(&config.tasks).unwrap();
        assert!(cycle.len() >= 2);
    }

    #[test]
    fn first_ready_task_has_no_dependencies() {
        let config = linear_chain_config();
        let mut states = TaskStates::new();
        let ready = get_ready_tasks(&config.tasks, &mut states);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id.as_str(), "A");
    }

    #[test]
    fn dispatch_advances_linear_chain() {
        let config = linear_chain_config();
        let mut states = TaskStates::new();

        let (task, prompt) =
            dispatch_next_task(&config.tasks, &mut states, 1000, None, None).unwrap();
        assert_eq!(task.unwrap().id.as_str(), "A");
        assert!(prompt.is_some());
        assert_eq!(states[&TaskId::from("A")].status, TaskStatus::Running);

        let (task, prompt) = dispatch_next_task(
            &config.tasks,
            &mut states,
            1100,
            Some(&TaskId::from("A")),
            Some("built A.out"),
        )
        .unwrap();
        assert_eq!(task.unwrap().id.as_str(), "B");
        assert!(prompt.unwrap().contains("built A.out"));
        assert_eq!(states[&TaskId::from("A")].status, TaskStatus::Completed);
    }

    #[test]
    fn review_gated_task_blocks_without_prompt() {
        let task = Task::builder().id("r").requires_human_review(true).build();
        let config = TaskConfig {
            tasks: vec![task],
            ..Default::default()
        };
        let mut states = TaskStates::new();
        let (task, prompt) =
            dispatch_next_task(&config.tasks, &mut states, 1000, None, None).unwrap();
        assert!(task.is_some());
        assert!(prompt.is_none());
        assert_eq!(states[&TaskId::from("r")].status, TaskStatus::Blocked);
    }

    #[test]
    fn approve_task_returns_blocked_to_pending() {
        let mut states = TaskStates::new();
        let id = TaskId::from("r");
        states.entry(id.clone()).or_default().status = TaskStatus::Blocked;
        assert!(approve_task(&id, &mut states));
        assert_eq!(states[&id].status, TaskStatus::Pending);
        assert!(!approve_task(&id, &mut states));
    }

    #[test]
    fn retry_does_not_reset_started_at() {
        let mut states = TaskStates::new();
        let id = TaskId::from("a");
        mark_task_running(&id, &mut states, 1000);
        let first_start = states[&id].started_at;
        mark_task_running(&id, &mut states, 2000);
        assert_eq!(states[&id].started_at, first_start);
        assert_eq!(states[&id].sends, 2);
    }

    #[test]
    fn cyclic_dispatch_errors() {
        let config = cyclic_config();
        let mut states = TaskStates::new();
        let result = dispatch_next_task(&config.tasks, &mut states, 1000, None, None);
        assert!(matches!(result, Err(OrchestratorError::CyclicDependency(_))));
    }
}
