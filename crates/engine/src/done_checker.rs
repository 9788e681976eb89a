// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evaluates a task's `done_when` predicate bundle: file existence/size/
//! content, glob counts, and shell-command exit codes.

use autopilot_core::task::{CommandCheck, DoneWhen, FileCheck, GlobCheck};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    File,
    Glob,
    Command,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Glob => "glob",
            Self::Command => "command",
        })
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub description: String,
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone)]
pub struct DoneResult {
    pub passed: bool,
    pub results: Vec<CheckResult>,
    pub summary: String,
}

impl DoneResult {
    pub fn failed_items(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

pub fn check_file_condition(spec: &FileCheck, project_dir: &Path, default_min_size: u64) -> CheckResult {
    let full_path = project_dir.join(&spec.path);
    let min_size = spec.min_size.unwrap_or(default_min_size);
    let description = format!("file: {}", spec.path);

    let Ok(metadata) = std::fs::metadata(&full_path) else {
        return CheckResult {
            kind: CheckKind::File,
            description,
            passed: false,
            details: "file does not exist".into(),
        };
    };

    let size = metadata.len();
    if size < min_size {
        return CheckResult {
            kind: CheckKind::File,
            description,
            passed: false,
            details: format!("size {size} bytes < required {min_size} bytes"),
        };
    }

    if !spec.contains.is_empty() {
        let content = std::fs::read_to_string(&full_path).unwrap_or_default();
        let missing: Vec<&str> = spec
            .contains
            .iter()
            .filter(|kw| !content.contains(kw.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return CheckResult {
                kind: CheckKind::File,
                description,
                passed: false,
                details: format!("missing keywords: {}", missing.join(", ")),
            };
        }
    }

    CheckResult {
        kind: CheckKind::File,
        description,
        passed: true,
        details: format!("exists, {size} bytes"),
    }
}

pub fn check_glob_condition(spec: &GlobCheck, project_dir: &Path, default_min_size: u64) -> CheckResult {
    let min_count = spec.min_count.unwrap_or(1);
    let min_file_size = spec.min_file_size.unwrap_or(default_min_size);
    let description = format!("glob: {}", spec.pattern);

    let full_pattern = project_dir.join(&spec.pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let valid_count = glob::glob(&pattern_str)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .filter(|path| {
            std::fs::metadata(path)
                .map(|m| m.len() >= min_file_size)
                .unwrap_or(false)
        })
        .count();

    if valid_count < min_count {
        return CheckResult {
            kind: CheckKind::Glob,
            description,
            passed: false,
            details: format!("found {valid_count} files < required {min_count}"),
        };
    }

    CheckResult {
        kind: CheckKind::Glob,
        description,
        passed: true,
        details: format!("found {valid_count} files >= {min_count}"),
    }
}

pub fn check_command_condition(spec: &CommandCheck, project_dir: &Path) -> CheckResult {
    let cmd = spec.command.replace("{project_dir}", &project_dir.to_string_lossy());
    let short_cmd: String = if cmd.len() <= 50 {
        cmd.clone()
    } else {
        format!("{}...", &cmd[..47])
    };
    let description = format!("command: {short_cmd}");

    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(&cmd)
        .current_dir(project_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return CheckResult {
                kind: CheckKind::Command,
                description,
                passed: false,
                details: format!("failed to execute: {e}"),
            };
        }
    };

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if start.elapsed() >= COMMAND_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return CheckResult {
                    kind: CheckKind::Command,
                    description,
                    passed: false,
                    details: format!("failed to wait on command: {e}"),
                };
            }
        }
    };

    let Some(status) = status else {
        return CheckResult {
            kind: CheckKind::Command,
            description,
            passed: false,
            details: format!("timed out after {}s", COMMAND_TIMEOUT.as_secs()),
        };
    };

    let code = status.code().unwrap_or(-1);
    if code == spec.expect_exit {
        CheckResult {
            kind: CheckKind::Command,
            description,
            passed: true,
            details: format!("exit code = {code}"),
        }
    } else {
        let mut stderr_raw = String::new();
        if let Some(mut stderr) = child.stderr.take() {
            use std::io::Read;
            let _ = stderr.read_to_string(&mut stderr_raw);
        }
        let stderr: String = stderr_raw.chars().take(200).collect();
        CheckResult {
            kind: CheckKind::Command,
            description,
            passed: false,
            details: format!(
                "exit code = {code}, expected {}. stderr: {stderr}",
                spec.expect_exit
            ),
        }
    }
}

/// Evaluates all three check families. An absent `done_when` passes
/// trivially — tasks with no completion predicate are considered done as
/// soon as they're dispatched once.
pub fn check_done_conditions(
    done_when: Option<&DoneWhen>,
    project_dir: &Path,
    default_min_size: u64,
) -> DoneResult {
    let Some(done_when) = done_when else {
        return DoneResult {
            passed: true,
            results: Vec::new(),
            summary: "no completion predicate".into(),
        };
    };

    let mut results = Vec::new();
    for file_spec in &done_when.files {
        results.push(check_file_condition(file_spec, project_dir, default_min_size));
    }
    for glob_spec in &done_when.files_glob {
        results.push(check_glob_condition(glob_spec, project_dir, default_min_size));
    }
    for cmd_spec in &done_when.commands {
        results.push(check_command_condition(cmd_spec, project_dir));
    }

    let all_passed = results.iter().all(|r| r.passed);
    let summary = if all_passed {
        format!("all {} checks passed", results.len())
    } else {
        let failed = results.iter().filter(|r| !r.passed).count();
        format!("{failed}/{} checks failed", results.len())
    };

    DoneResult {
        passed: all_passed,
        results,
        summary,
    }
}

pub fn format_done_result(result: &DoneResult) -> String {
    let mut lines = vec![format!(
        "completion check: {}",
        if result.passed { "all passed" } else { "has failures" }
    )];
    lines.push(format!("summary: {}", result.summary));

    if !result.results.is_empty() {
        lines.push(String::new());
        lines.push("details:".into());
        for r in &result.results {
            let mark = if r.passed { "✅" } else { "❌" };
            lines.push(format!("  {mark} [{}] {}", r.kind, r.description));
            if !r.details.is_empty() {
                lines.push(format!("      {}", r.details));
            }
        }
    }

    lines.join("\n")
}
