// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level error surface for a single tick and for the cleanup utility.
//!
//! No variant here is allowed to escape as a process exit code other than
//! 0 for the tick binary; `TickError` exists so `run_tick` has something
//! concrete to log and notify on, not so `main` can propagate it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickError {
    #[error("state store error: {0}")]
    State(#[from] autopilot_storage::StateError),

    #[error("transport binary not runnable: {0}")]
    TransportUnavailable(String),

    #[error("failed to read project manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state store error: {0}")]
    State(#[from] autopilot_storage::StateError),
}
