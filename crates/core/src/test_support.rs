// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures used across the workspace's `test-support` feature.

use crate::task::{DoneWhen, FileCheck, Task, TaskConfig};

/// A linear A -> B -> C task manifest, matching the end-to-end "linear DAG
/// advance" scenario used throughout the engine's integration tests.
pub fn linear_chain_config() -> TaskConfig {
    let a = Task::builder()
        .id("A")
        .name("Task A")
        .prompt("Do task A.")
        .done_when(DoneWhen {
            files: vec![FileCheck {
                path: "A.out".into(),
                min_size: Some(1),
                contains: vec![],
            }],
            ..Default::default()
        })
        .build();

    let b = Task::builder()
        .id("B")
        .name("Task B")
        .prompt("Do task B.")
        .depends_on(vec!["A".into()])
        .build();

    let c = Task::builder()
        .id("C")
        .name("Task C")
        .prompt("Do task C.")
        .depends_on(vec!["B".into()])
        .build();

    TaskConfig {
        tasks: vec![a, b, c],
        ..Default::default()
    }
}

/// A -> B, B -> A: a manifest whose dependency graph is cyclic.
pub fn cyclic_config() -> TaskConfig {
    let a = Task::builder()
        .id("A")
        .name("Task A")
        .depends_on(vec!["B".into()])
        .build();
    let b = Task::builder()
        .id("B")
        .name("Task B")
        .depends_on(vec!["A".into()])
        .build();

    TaskConfig {
        tasks: vec![a, b],
        ..Default::default()
    }
}
