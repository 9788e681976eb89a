// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-based milestone progress, independent of any task manifest —
//! used for projects running in schedule-only mode with no `tasks.yaml`.

use std::path::Path;

/// A named milestone and the file/glob patterns that define "done" for it.
/// Order matters: [`format_progress`] renders milestones in declaration order.
pub type MilestoneSpec = Vec<(String, Vec<String>)>;

#[derive(Debug, Clone)]
pub struct MilestoneProgress {
    pub name: String,
    pub total_patterns: usize,
    pub existing_patterns: usize,
}

impl MilestoneProgress {
    pub fn percentage(&self) -> u32 {
        if self.total_patterns == 0 {
            100
        } else {
            (self.existing_patterns * 100 / self.total_patterns) as u32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.existing_patterns >= self.total_patterns
    }
}

#[derive(Debug, Clone)]
pub struct ProjectProgress {
    pub milestones: Vec<MilestoneProgress>,
}

impl ProjectProgress {
    pub fn overall_percentage(&self) -> u32 {
        if self.milestones.is_empty() {
            return 0;
        }
        let total: usize = self.milestones.iter().map(|m| m.total_patterns).sum();
        let existing: usize = self.milestones.iter().map(|m| m.existing_patterns).sum();
        if total == 0 {
            100
        } else {
            (existing * 100 / total) as u32
        }
    }
}

fn detect_default_milestones(project_dir: &Path) -> MilestoneSpec {
    let has = |name: &str| project_dir.join(name).exists();

    if has("package.json") {
        vec![
            ("M1-Init".into(), vec!["package.json".into(), "tsconfig.json".into()]),
            ("M2-Core".into(), vec!["src/**/*.ts".into(), "src/**/*.tsx".into()]),
            (
                "M3-Tests".into(),
                vec!["**/*.test.ts".into(), "**/*.test.tsx".into(), "**/*.spec.ts".into()],
            ),
        ]
    } else if has("Cargo.toml") {
        vec![
            ("M1-Init".into(), vec!["Cargo.toml".into(), "Cargo.lock".into()]),
            ("M2-Core".into(), vec!["src/**/*.rs".into()]),
        ]
    } else if has("pyproject.toml") || has("requirements.txt") {
        let init_file = if has("pyproject.toml") { "pyproject.toml" } else { "requirements.txt" };
        vec![
            ("M1-Init".into(), vec![init_file.into()]),
            ("M2-Core".into(), vec!["**/*.py".into()]),
            ("M3-Tests".into(), vec!["tests/**/*.py".into(), "test_*.py".into()]),
        ]
    } else {
        vec![("M1-Files".into(), vec!["*".into()])]
    }
}

fn pattern_exists(project_dir: &Path, pattern: &str) -> bool {
    if pattern.contains('*') || pattern.contains('?') {
        let full = project_dir.join(pattern);
        glob::glob(&full.to_string_lossy())
            .map(|mut matches| matches.next().is_some())
            .unwrap_or(false)
    } else {
        project_dir.join(pattern).exists()
    }
}

/// Scans `project_dir` against `milestones`, or the default per-project-type
/// set (detected from `package.json`/`Cargo.toml`/`pyproject.toml`/
/// `requirements.txt`) when `milestones` is `None`.
pub fn scan_project_progress(project_dir: &Path, milestones: Option<MilestoneSpec>) -> ProjectProgress {
    let milestones = milestones.unwrap_or_else(|| detect_default_milestones(project_dir));

    let progress = milestones
        .into_iter()
        .map(|(name, patterns)| {
            let total = patterns.len();
            let existing = patterns
                .iter()
                .filter(|p| pattern_exists(project_dir, p))
                .count();
            MilestoneProgress {
                name,
                total_patterns: total,
                existing_patterns: existing,
            }
        })
        .collect();

    ProjectProgress { milestones: progress }
}

/// e.g. `"M1-Init[OK] > M2-Core[75%] > M3-Tests[0%]"`.
pub fn format_progress(progress: &ProjectProgress) -> String {
    progress
        .milestones
        .iter()
        .map(|m| {
            if m.is_complete() {
                format!("{}[OK]", m.name)
            } else {
                format!("{}[{}%]", m.name, m.percentage())
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn get_current_milestone(progress: &ProjectProgress) -> Option<&str> {
    progress
        .milestones
        .iter()
        .find(|m| !m.is_complete())
        .map(|m| m.name.as_str())
}

pub fn get_remaining_work(progress: &ProjectProgress) -> String {
    let remaining: Vec<String> = progress
        .milestones
        .iter()
        .filter(|m| !m.is_complete())
        .map(|m| format!("{}({}%)", m.name, m.percentage()))
        .collect();

    if remaining.is_empty() {
        "none".to_string()
    } else {
        remaining.join(", ")
    }
}
