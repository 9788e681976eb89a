// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finds candidate transcript files under the transcript producer's session
//! directory. Two-pass: a dated-directory scan for the trailing N days, then
//! a best-effort whole-tree walk for anything modified in the last hour
//! (catches a session still being written under a stale date directory).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

const SCAN_DAYS: i64 = 7;
const RECENT_WINDOW: Duration = Duration::from_secs(60 * 60);
const WALK_BUDGET: Duration = Duration::from_secs(10);

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonl")
}

/// Pass one: `<base>/YYYY/MM/DD/*.jsonl` for each of the trailing `SCAN_DAYS`
/// calendar days.
fn scan_dated_directories(base: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let today = chrono::Utc::now().date_naive();
    for offset in 0..SCAN_DAYS {
        let Some(day) = today.checked_sub_signed(chrono::Duration::days(offset)) else {
            continue;
        };
        let dir = base
            .join(format!("{:04}", day.format("%Y")))
            .join(format!("{:02}", day.format("%m")))
            .join(format!("{:02}", day.format("%d")));
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_jsonl(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Pass two: best-effort recursive walk of the whole base directory,
/// collecting files modified within `RECENT_WINDOW`. Bounded by
/// `WALK_BUDGET` wall-clock time; on timeout, returns whatever was found so
/// far rather than failing the scan outright (degrades to first-pass-only
/// coverage for anything it didn't reach in time).
fn scan_recently_modified(base: &Path) -> Vec<PathBuf> {
    let deadline = Instant::now() + WALK_BUDGET;
    let now = SystemTime::now();
    let mut found = Vec::new();
    let mut stack = vec![base.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if Instant::now() >= deadline {
            break;
        }
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if !is_jsonl(&path) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if now.duration_since(modified).unwrap_or(Duration::MAX) <= RECENT_WINDOW {
                found.push(path);
            }
        }
    }

    found
}

/// Runs both passes against `sessions_base`, de-duplicated.
pub fn discover_jsonl_paths(sessions_base: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for path in scan_dated_directories(sessions_base) {
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }
    for path in scan_recently_modified(sessions_base) {
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }

    paths
}

/// Resolve the transcript producer's session directory:
/// `AUTOPILOT_SESSIONS_DIR` override, else `~/.codex/sessions`.
pub fn sessions_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AUTOPILOT_SESSIONS_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".codex").join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_scan_finds_todays_file() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::Utc::now().date_naive();
        let dated = dir
            .path()
            .join(format!("{:04}", today.format("%Y")))
            .join(format!("{:02}", today.format("%m")))
            .join(format!("{:02}", today.format("%d")));
        std::fs::create_dir_all(&dated).unwrap();
        std::fs::write(dated.join("rollout-abc.jsonl"), "{}").unwrap();

        let found = scan_dated_directories(dir.path());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn recent_scan_ignores_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2020/01/01");
        std::fs::create_dir_all(&nested).unwrap();
        let path = nested.join("rollout-old.jsonl");
        std::fs::write(&path, "{}").unwrap();
        let old_time = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
        let file = std::fs::File::open(&path).unwrap();
        file.set_modified(old_time).unwrap();

        let found = scan_recently_modified(dir.path());
        assert!(found.is_empty());
    }

    #[test]
    fn discover_jsonl_paths_dedups_across_passes() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::Utc::now().date_naive();
        let dated = dir
            .path()
            .join(format!("{:04}", today.format("%Y")))
            .join(format!("{:02}", today.format("%m")))
            .join(format!("{:02}", today.format("%d")));
        std::fs::create_dir_all(&dated).unwrap();
        std::fs::write(dated.join("rollout-fresh.jsonl"), "{}").unwrap();

        let found = discover_jsonl_paths(dir.path());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn sessions_base_dir_honors_override() {
        std::env::set_var("AUTOPILOT_SESSIONS_DIR", "/tmp/autopilot-sessions-test");
        assert_eq!(sessions_base_dir(), PathBuf::from("/tmp/autopilot-sessions-test"));
        std::env::remove_var("AUTOPILOT_SESSIONS_DIR");
    }
}
