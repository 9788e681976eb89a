// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The autopilot's single persisted state document: per-project send
//! counters and task progress, plus a capped operation history.
//!
//! Persistence is atomic (write to a tempfile in the same directory, fsync,
//! rename over the target) rather than the bare overwrite a quick script
//! would use — a tick killed mid-write must never leave a half-written
//! state file behind.

use crate::error::StateError;
use autopilot_core::task::TaskId;
use autopilot_core::task_state::TaskStateInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

pub const MAX_HISTORY_ENTRIES: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

const MAX_REPLY_LEN: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub daily_sends: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_sends_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_send_at: Option<u64>,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_output_hash: Option<String>,
    #[serde(default)]
    pub loop_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<TaskId>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub task_states: HashMap<TaskId, TaskStateInfo>,
    #[serde(default)]
    pub lifecycle: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalState {
    #[serde(default)]
    pub projects: HashMap<String, ProjectState>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tick_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub active_projects: Vec<String>,
    #[serde(default)]
    pub paused_projects: Vec<String>,
    #[serde(default)]
    pub project_send_order: Vec<String>,
}

impl GlobalState {
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Ok(Self {
                started_at: Some(chrono::Utc::now()),
                ..Self::default()
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the state document atomically: serialize, write to a sibling
    /// tempfile, fsync, then rename over `path`. A crash mid-write leaves
    /// either the old file or the new one intact, never a partial file.
    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let start = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..start);
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|source| StateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        let json = serde_json::to_vec_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        let mut tmp = std::fs::File::create(&tmp_path).map_err(|source| StateError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.write_all(&json).map_err(|source| StateError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.sync_all().map_err(|source| StateError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        drop(tmp);

        std::fs::rename(&tmp_path, path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn project_state_mut(&mut self, project_dir: &str) -> &mut ProjectState {
        self.projects.entry(project_dir.to_string()).or_default()
    }

    pub fn record_history(&mut self, mut entry: HistoryEntry) {
        if let Some(reply) = &entry.reply {
            if reply.chars().count() > MAX_REPLY_LEN {
                entry.reply = Some(reply.chars().take(MAX_REPLY_LEN).collect());
            }
        }
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let start = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..start);
        }
    }

    /// Sum of `daily_sends` across all projects whose counter is dated
    /// `today` (`YYYY-MM-DD`).
    pub fn total_daily_sends(&self, today: &str) -> u32 {
        self.projects
            .values()
            .filter(|p| p.daily_sends_date.as_deref() == Some(today))
            .map(|p| p.daily_sends)
            .sum()
    }
}

/// Zeroes `daily_sends` when `today` doesn't match the counter's stamped
/// date — a fresh calendar day resets the quota.
pub fn reset_daily_sends_if_needed(state: &mut ProjectState, today: &str) {
    if state.daily_sends_date.as_deref() != Some(today) {
        state.daily_sends = 0;
        state.daily_sends_date = Some(today.to_string());
    }
}

pub fn increment_send_count(state: &mut ProjectState, today: &str, now_epoch_secs: u64) {
    reset_daily_sends_if_needed(state, today);
    state.daily_sends += 1;
    state.last_send_at = Some(now_epoch_secs);
}

/// `true` when fewer than `cooldown_secs` have elapsed since the project's
/// last send (i.e. it should be skipped this tick).
pub fn check_cooldown(state: &ProjectState, cooldown_secs: u64, now_epoch_secs: u64) -> bool {
    match state.last_send_at {
        Some(last) => now_epoch_secs.saturating_sub(last) < cooldown_secs,
        None => false,
    }
}

pub fn check_daily_limit(state: &mut ProjectState, max_daily_sends: u32, today: &str) -> bool {
    reset_daily_sends_if_needed(state, today);
    state.daily_sends >= max_daily_sends
}
