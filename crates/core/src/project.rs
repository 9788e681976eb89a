// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A registered project and its lifecycle.

use crate::task::{TaskConfig, TaskOverrides};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A project's place in the scheduler's control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectLifecycle {
    Disabled,
    Enabled,
    Running,
    Paused,
    Completed,
    Error,
}

crate::simple_display! {
    ProjectLifecycle {
        Disabled => "disabled",
        Enabled => "enabled",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Error => "error",
    }
}

impl Default for ProjectLifecycle {
    fn default() -> Self {
        Self::Enabled
    }
}

impl ProjectLifecycle {
    /// Projects the scheduler considers for dispatch this tick.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, Self::Enabled | Self::Running)
    }
}

/// A project discovered from the registry (merged config `project_dirs` and
/// on-disk `tasks.yaml` manifests). Rebuilt fresh every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub overrides: TaskOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_config: Option<TaskConfig>,
    #[serde(default)]
    pub lifecycle: ProjectLifecycle,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    10
}

impl Project {
    /// A minimal project descriptor for a directory with no manifest (or one
    /// that failed to parse) — still schedulable, at the lowest default
    /// priority tier.
    pub fn minimal(name: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            dir,
            enabled: true,
            priority: default_priority(),
            overrides: TaskOverrides::default(),
            task_config: None,
            lifecycle: ProjectLifecycle::default(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct ProjectBuilder {
    name: String,
    dir: PathBuf,
    enabled: bool,
    priority: i32,
    task_config: Option<TaskConfig>,
    lifecycle: ProjectLifecycle,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for ProjectBuilder {
    fn default() -> Self {
        Self {
            name: "demo".into(),
            dir: PathBuf::from("/tmp/demo"),
            enabled: true,
            priority: default_priority(),
            task_config: None,
            lifecycle: ProjectLifecycle::default(),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ProjectBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn task_config(mut self, config: TaskConfig) -> Self {
        self.task_config = Some(config);
        self
    }

    pub fn lifecycle(mut self, lifecycle: ProjectLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn build(self) -> Project {
        Project {
            name: self.name,
            dir: self.dir,
            enabled: self.enabled,
            priority: self.priority,
            overrides: TaskOverrides::default(),
            task_config: self.task_config,
            lifecycle: self.lifecycle,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Project {
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_and_running_are_schedulable() {
        assert!(ProjectLifecycle::Enabled.is_schedulable());
        assert!(ProjectLifecycle::Running.is_schedulable());
        assert!(!ProjectLifecycle::Paused.is_schedulable());
        assert!(!ProjectLifecycle::Disabled.is_schedulable());
    }

    #[test]
    fn minimal_project_has_default_priority() {
        let p = Project::minimal("demo", PathBuf::from("/tmp/demo"));
        assert_eq!(p.priority, 10);
        assert!(p.task_config.is_none());
    }
}
