// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The classifier's label for an agent's last utterance.

use serde::{Deserialize, Serialize};

/// One of the six labels the intent classifier can assign to an agent's
/// last message. Never persisted — derived fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    Error,
    Choice,
    Confirm,
    TaskComplete,
    Review,
    Default,
}

crate::simple_display! {
    Intent {
        Error => "error",
        Choice => "choice",
        Confirm => "confirm",
        TaskComplete => "task-complete",
        Review => "review",
        Default => "default",
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::Default
    }
}
