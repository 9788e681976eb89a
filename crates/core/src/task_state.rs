// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task state machine and its persisted record.

use serde::{Deserialize, Serialize};

/// A task's position in the orchestrator's state machine.
///
/// Transitions are driven exclusively by the orchestrator (`autopilot-engine`);
/// see its `dispatch_next_task`/`mark_task_*`/`approve_task` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Verifying,
    Completed,
    Failed,
    Blocked,
}

crate::simple_display! {
    TaskStatus {
        Pending => "PENDING",
        Ready => "READY",
        Running => "RUNNING",
        Verifying => "VERIFYING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Blocked => "BLOCKED",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn kind(&self) -> TaskStatusKind {
        TaskStatusKind::from(*self)
    }
}

/// Tag-only projection of [`TaskStatus`], used where only the status name
/// matters (dashboard glyphs, protocol summaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatusKind {
    Pending,
    Ready,
    Running,
    Verifying,
    Completed,
    Failed,
    Blocked,
}

impl From<TaskStatus> for TaskStatusKind {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::Ready => Self::Ready,
            TaskStatus::Running => Self::Running,
            TaskStatus::Verifying => Self::Verifying,
            TaskStatus::Completed => Self::Completed,
            TaskStatus::Failed => Self::Failed,
            TaskStatus::Blocked => Self::Blocked,
        }
    }
}

/// Persisted per-task record, stored in a project's `task_states` map.
///
/// `last_codex_output` is truncated to 500 characters at write time, matching
/// the wire contract in the external state-file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStateInfo {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default)]
    pub sends: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_send_at: Option<u64>,
}

const MAX_LAST_OUTPUT_LEN: usize = 500;

impl TaskStateInfo {
    pub fn is_waiting_for_review(&self) -> bool {
        self.status == TaskStatus::Blocked
    }

    /// Store `output`, truncated to [`MAX_LAST_OUTPUT_LEN`] chars (char-boundary safe).
    pub fn set_last_output(&mut self, output: &str) {
        self.last_output = Some(truncate_chars(output, MAX_LAST_OUTPUT_LEN));
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn only_completed_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Blocked.is_terminal());
    }

    #[test]
    fn last_output_truncated_to_500_chars() {
        let mut info = TaskStateInfo::default();
        let long = "x".repeat(600);
        info.set_last_output(&long);
        assert_eq!(info.last_output.unwrap().chars().count(), 500);
    }

    #[test]
    fn last_output_under_limit_preserved() {
        let mut info = TaskStateInfo::default();
        info.set_last_output("short");
        assert_eq!(info.last_output.unwrap(), "short");
    }

    #[yare::parameterized(
        pending = { TaskStatus::Pending, "PENDING" },
        ready = { TaskStatus::Ready, "READY" },
        running = { TaskStatus::Running, "RUNNING" },
        verifying = { TaskStatus::Verifying, "VERIFYING" },
        completed = { TaskStatus::Completed, "COMPLETED" },
        failed = { TaskStatus::Failed, "FAILED" },
        blocked = { TaskStatus::Blocked, "BLOCKED" },
    )]
    fn display_matches_wire_format(status: TaskStatus, expected: &str) {
        assert_eq!(status.to_string(), expected);
    }
}
