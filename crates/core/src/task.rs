// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A project's declared task and its completion predicate.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::ops::Deref;

/// A task identifier as declared in a project manifest (`tasks[].id`).
///
/// Unlike the generated ids elsewhere in this workspace, task ids are
/// operator-authored free text, so this wraps a [`SmolStr`] rather than the
/// fixed-capacity `IdBuf`/`define_id!` pattern used for generated ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(SmolStr);

impl TaskId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(s))
    }
}

impl Deref for TaskId {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

/// A file-existence/size/substring completion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCheck {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
}

/// A glob-count completion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobCheck {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_file_size: Option<u64>,
}

/// A shell-command exit-code completion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandCheck {
    /// May contain the literal placeholder `{project_dir}`.
    pub command: String,
    #[serde(default = "default_expect_exit")]
    pub expect_exit: i32,
}

fn default_expect_exit() -> i32 {
    0
}

/// A declarative bundle of completion predicates across the three check
/// families. An empty bundle passes trivially.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoneWhen {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "files_glob")]
    pub files_glob: Vec<GlobCheck>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandCheck>,
}

impl DoneWhen {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.files_glob.is_empty() && self.commands.is_empty()
    }
}

/// A single task as declared in a project's `tasks.yaml` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub prompt: String,
    #[serde(default, rename = "depends_on", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,
    #[serde(default, rename = "done_when", skip_serializing_if = "Option::is_none")]
    pub done_when: Option<DoneWhen>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_complete: Option<String>,
    #[serde(default, rename = "requires_human_review")]
    pub requires_human_review: bool,
}

/// Overrides applicable to a project at manifest-merge time, e.g. per-project
/// cooldown/daily-cap relaxations from the config file's `overrides` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_sends: Option<u32>,
}

/// Defaults applied across a manifest's tasks, e.g. a project-wide
/// `min_file_size` floor used when a [`FileCheck`] omits one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefaults {
    #[serde(default = "default_min_file_size")]
    pub min_file_size: u64,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            min_file_size: default_min_file_size(),
        }
    }
}

fn default_min_file_size() -> u64 {
    1
}

/// A project's full task manifest (`tasks.yaml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub defaults: TaskDefaults,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[cfg(any(test, feature = "test-support"))]
pub struct TaskBuilder {
    id: TaskId,
    name: String,
    prompt: String,
    depends_on: Vec<TaskId>,
    done_when: Option<DoneWhen>,
    requires_human_review: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for TaskBuilder {
    fn default() -> Self {
        Self {
            id: TaskId::from("task-1"),
            name: "task-1".into(),
            prompt: "do the thing".into(),
            depends_on: Vec::new(),
            done_when: None,
            requires_human_review: false,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn done_when(mut self, done_when: DoneWhen) -> Self {
        self.done_when = Some(done_when);
        self
    }

    pub fn requires_human_review(mut self, value: bool) -> Self {
        self.requires_human_review = value;
        self
    }

    pub fn build(self) -> Task {
        Task {
            id: self.id,
            name: self.name,
            prompt: self.prompt,
            depends_on: self.depends_on,
            done_when: self.done_when,
            on_complete: None,
            requires_human_review: self.requires_human_review,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }
}
