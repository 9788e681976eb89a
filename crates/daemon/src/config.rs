// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file (`config.yaml`) schema and path resolution.
//!
//! Loading is infallible at the file-missing level: a missing or malformed
//! file yields a default `Config` with an empty `project_dirs`. The tick
//! driver is the layer that treats an empty config as fatal.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_cooldown() -> u64 {
    120
}

fn default_max_daily_sends() -> u32 {
    50
}

fn default_max_daily_sends_total() -> u32 {
    200
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_loop_detection_threshold() -> u32 {
    3
}

fn default_max_done_age() -> u64 {
    7200
}

fn default_user_wait_timeout() -> u64 {
    600
}

fn default_verify_poll_interval() -> u64 {
    5
}

fn default_verify_max_wait() -> u64 {
    30
}

fn default_max_sends_per_tick() -> u32 {
    1
}

fn default_inter_project_delay() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerStrategyConfig {
    Priority,
    RoundRobin,
}

impl Default for SchedulerStrategyConfig {
    fn default() -> Self {
        Self::RoundRobin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub strategy: SchedulerStrategyConfig,
    #[serde(default = "default_max_sends_per_tick")]
    pub max_sends_per_tick: u32,
    #[serde(default = "default_inter_project_delay")]
    pub inter_project_delay: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: SchedulerStrategyConfig::default(),
            max_sends_per_tick: default_max_sends_per_tick(),
            inter_project_delay: default_inter_project_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl BusConfig {
    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.channel_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project_dirs: Vec<PathBuf>,
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
    #[serde(default = "default_max_daily_sends")]
    pub max_daily_sends: u32,
    #[serde(default = "default_max_daily_sends_total")]
    pub max_daily_sends_total: u32,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_loop_detection_threshold")]
    pub loop_detection_threshold: u32,
    #[serde(default = "default_max_done_age")]
    pub max_done_age: u64,
    #[serde(default = "default_user_wait_timeout")]
    pub user_wait_timeout: u64,
    #[serde(default = "default_verify_poll_interval")]
    pub verify_poll_interval: u64,
    #[serde(default = "default_verify_max_wait")]
    pub verify_max_wait: u64,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub bus: Option<BusConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_dirs: Vec::new(),
            cooldown: default_cooldown(),
            max_daily_sends: default_max_daily_sends(),
            max_daily_sends_total: default_max_daily_sends_total(),
            max_consecutive_failures: default_max_consecutive_failures(),
            loop_detection_threshold: default_loop_detection_threshold(),
            max_done_age: default_max_done_age(),
            user_wait_timeout: default_user_wait_timeout(),
            verify_poll_interval: default_verify_poll_interval(),
            verify_max_wait: default_verify_max_wait(),
            scheduler: SchedulerConfig::default(),
            bus: None,
        }
    }
}

impl Config {
    /// `true` when no projects are registered anywhere in the config — the
    /// tick driver treats this as a fatal, abort-the-tick condition.
    pub fn is_empty(&self) -> bool {
        self.project_dirs.is_empty()
    }
}

/// Resolve the config directory: `AUTOPILOT_CONFIG_DIR` > `XDG_CONFIG_HOME/autopilot` > `~/.autopilot`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AUTOPILOT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("autopilot");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".autopilot")
}

pub fn config_file_path(dir: &Path) -> PathBuf {
    dir.join("config.yaml")
}

pub fn state_file_path(dir: &Path) -> PathBuf {
    dir.join("state.json")
}

pub fn log_dir(dir: &Path) -> PathBuf {
    dir.join("logs")
}

pub fn registered_projects_dir(dir: &Path) -> PathBuf {
    dir.join("projects")
}

/// Loads and parses `path`; a missing or malformed file yields
/// `Config::default()` rather than an error.
pub fn load_config(path: &Path) -> Config {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Config::default();
    };
    serde_yaml::from_str(&raw).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "config file failed to parse, using defaults");
        Config::default()
    })
}
