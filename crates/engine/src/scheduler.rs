// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-project registration and round-robin/priority dispatch ordering.

use autopilot_core::{Project, ProjectLifecycle};
use autopilot_storage::{check_cooldown, check_daily_limit, GlobalState};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A merge-and-dedup of `~/.autopilot/projects/*/tasks.yaml` discoveries and
/// the config file's `project_dirs` list, keyed by project name so the same
/// project registered both ways is loaded once.
pub fn load_all_projects(
    registered: Vec<Project>,
    extra_dirs: &[PathBuf],
) -> Vec<Project> {
    let mut by_name: HashMap<String, Project> = HashMap::new();
    for project in registered {
        by_name.insert(project.name.clone(), project);
    }

    for dir in extra_dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.to_string_lossy().into_owned());
        by_name
            .entry(name.clone())
            .or_insert_with(|| Project::minimal(name, dir.clone()));
    }

    by_name.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingStrategy {
    RoundRobin,
    Priority,
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        Self::RoundRobin
    }
}

/// Filters to schedulable, session-backed, non-cooldown, under-quota
/// projects, then orders them per `strategy`. Never truncates — the tick
/// driver decides how many of the returned projects it actually sends to.
pub fn schedule_projects(
    projects: &[Project],
    sessions_available: &dyn Fn(&Path) -> bool,
    state: &mut GlobalState,
    strategy: SchedulingStrategy,
    default_cooldown_secs: u64,
    default_max_daily_sends: u32,
    today: &str,
    now_epoch_secs: u64,
) -> Vec<Project> {
    let mut actionable: Vec<(Project, i64)> = Vec::new();

    for project in projects {
        if !project.lifecycle.is_schedulable() || !project.enabled {
            continue;
        }
        if !sessions_available(&project.dir) {
            continue;
        }

        let dir_key = project.dir.to_string_lossy().into_owned();
        let proj_state = state.project_state_mut(&dir_key);

        let cooldown = project.overrides.cooldown.unwrap_or(default_cooldown_secs);
        if check_cooldown(proj_state, cooldown, now_epoch_secs) {
            continue;
        }

        let max_daily = project
            .overrides
            .max_daily_sends
            .unwrap_or(default_max_daily_sends);
        if check_daily_limit(proj_state, max_daily, today) {
            continue;
        }

        let sort_key = match strategy {
            SchedulingStrategy::Priority => project.priority as i64,
            SchedulingStrategy::RoundRobin => {
                proj_state.last_send_at.map(|t| t as i64).unwrap_or(0)
            }
        };

        actionable.push((project.clone(), sort_key));
    }

    actionable.sort_by_key(|(_, key)| *key);
    actionable.into_iter().map(|(p, _)| p).collect()
}

pub fn update_project_lifecycle(
    project: &mut Project,
    new_lifecycle: ProjectLifecycle,
    state: &mut GlobalState,
) {
    project.lifecycle = new_lifecycle;

    state.active_projects.retain(|n| n != &project.name);
    state.paused_projects.retain(|n| n != &project.name);

    match new_lifecycle {
        ProjectLifecycle::Enabled | ProjectLifecycle::Running => {
            state.active_projects.push(project.name.clone());
        }
        ProjectLifecycle::Paused => {
            state.paused_projects.push(project.name.clone());
        }
        _ => {}
    }
}

const MAX_SEND_ORDER_ENTRIES: usize = 100;

/// Moves `project_name` to the end of the round-robin send order, so it's
/// considered least-recently-sent-to next tick.
pub fn update_project_send_order(project_name: &str, state: &mut GlobalState) {
    state.project_send_order.retain(|n| n != project_name);
    state.project_send_order.push(project_name.to_string());
    if state.project_send_order.len() > MAX_SEND_ORDER_ENTRIES {
        let start = state.project_send_order.len() - MAX_SEND_ORDER_ENTRIES;
        state.project_send_order.drain(..start);
    }
}

/// Exact match first, then case-insensitive prefix match.
pub fn get_project_by_name<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
    let name_lower = name.to_lowercase();
    projects
        .iter()
        .find(|p| p.name.to_lowercase() == name_lower)
        .or_else(|| projects.iter().find(|p| p.name.to_lowercase().starts_with(&name_lower)))
}
