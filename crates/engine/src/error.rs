// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the tick engine's pipeline stages.

use autopilot_core::task::TaskId;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("cyclic dependency detected: {0}")]
    CyclicDependency(String),
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown task id: {0}")]
    UnknownTask(TaskId),
}

#[derive(Debug, thiserror::Error)]
pub enum DoneCheckError {
    #[error("command timed out after {0}s")]
    Timeout(u64),
    #[error("failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),
}
