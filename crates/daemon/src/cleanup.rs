// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup cleanup: prunes state entries for projects no longer registered
//! anywhere in the current configuration. Run by the tick driver before
//! every tick (best-effort, via a subprocess call) and exposed as its own
//! binary for manual invocation.

use crate::config::{self, Config};
use crate::error::CleanupError;
use crate::tick::build_project_registry;
use autopilot_storage::GlobalState;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: Vec<String>,
}

pub fn run_cleanup(config_dir: &Path) -> Result<CleanupReport, CleanupError> {
    let config: Config = config::load_config(&config::config_file_path(config_dir));
    let registry = build_project_registry(config_dir, &config);
    let known_dirs: HashSet<String> = registry
        .iter()
        .map(|p| p.dir.to_string_lossy().into_owned())
        .collect();

    let state_path = config::state_file_path(config_dir);
    let mut state = GlobalState::load(&state_path)?;

    let stale: Vec<String> = state
        .projects
        .keys()
        .filter(|dir_key| !known_dirs.contains(dir_key.as_str()))
        .cloned()
        .collect();

    for dir_key in &stale {
        state.projects.remove(dir_key);
    }

    if !stale.is_empty() {
        state.save(&state_path)?;
    }

    Ok(CleanupReport { removed: stale })
}
