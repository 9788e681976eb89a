// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transcript discovery: finds each project's active Codex session and
//! extracts its last assistant message, using nothing but file mtime/size
//! and a reverse JSONL scan. Never retains session content across ticks.

use autopilot_core::SessionInfo;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

/// How far back (in bytes, from EOF) `is_last_message_from_user` reads.
const TAIL_SCAN_BYTES_SMALL: u64 = 50 * 1024;
/// How far back `read_last_assistant_message` reads — larger, since the last
/// assistant message itself may be long.
const TAIL_SCAN_BYTES_LARGE: u64 = 200 * 1024;

fn session_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})")
            .expect("static pattern compiles")
    })
}

fn extract_session_id(jsonl_path: &Path) -> Option<String> {
    let basename = jsonl_path.file_name()?.to_str()?;
    session_id_pattern()
        .find(basename)
        .map(|m| m.as_str().to_string())
}

/// First line of a session file carries the session's `cwd`; that mapping
/// never changes, so callers are expected to cache it across ticks keyed by
/// path (see [`SessionMetaCache`]).
fn read_session_cwd(jsonl_path: &Path) -> Option<PathBuf> {
    let mut file = std::fs::File::open(jsonl_path).ok()?;
    let mut buf = Vec::new();
    // A session_meta first line is small; reading the whole file would be
    // wasteful for a multi-hundred-MB transcript, so cap it generously.
    file.take(64 * 1024).read_to_end(&mut buf).ok()?;
    let text = String::from_utf8_lossy(&buf);
    let first_line = text.lines().next()?;
    let data: Value = serde_json::from_str(first_line).ok()?;
    if data.get("type")?.as_str()? != "session_meta" {
        return None;
    }
    let cwd = data.get("payload")?.get("cwd")?.as_str()?;
    Some(PathBuf::from(cwd))
}

/// Caches the permanent `path -> cwd` mapping read from each session's first
/// line, so repeat ticks never re-read a transcript's header.
#[derive(Debug, Default)]
pub struct SessionMetaCache {
    cwd_by_path: HashMap<PathBuf, PathBuf>,
}

impl SessionMetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cwd_for(&mut self, jsonl_path: &Path) -> Option<PathBuf> {
        if let Some(cwd) = self.cwd_by_path.get(jsonl_path) {
            return Some(cwd.clone());
        }
        let cwd = read_session_cwd(jsonl_path)?;
        self.cwd_by_path
            .insert(jsonl_path.to_path_buf(), cwd.clone());
        Some(cwd)
    }
}

/// Assigns each discovered transcript to the project whose directory is a
/// prefix of the transcript's `cwd`, keeping — per project — the session
/// with the largest file size (longest history), breaking ties by mtime.
pub fn discover_sessions(
    jsonl_paths: &[PathBuf],
    project_dirs: &[PathBuf],
    cache: &mut SessionMetaCache,
) -> HashMap<PathBuf, SessionInfo> {
    let mut sessions: HashMap<PathBuf, SessionInfo> = HashMap::new();

    for jsonl_path in jsonl_paths {
        let Ok(metadata) = std::fs::metadata(jsonl_path) else {
            continue;
        };
        let Ok(mtime) = metadata.modified() else {
            continue;
        };
        let Some(cwd) = cache.cwd_for(jsonl_path) else {
            continue;
        };

        let Some(project_dir) = project_dirs.iter().find(|dir| {
            let norm_dir = normalize(dir);
            let norm_cwd = normalize(&cwd);
            norm_cwd == norm_dir || norm_cwd.starts_with(&norm_dir)
        }) else {
            continue;
        };

        let file_size = metadata.len();
        let session_id = extract_session_id(jsonl_path).unwrap_or_default();
        let candidate = SessionInfo {
            path: jsonl_path.clone(),
            cwd: cwd.clone(),
            mtime,
            file_size,
            session_id,
        };

        match sessions.get(project_dir) {
            Some(existing)
                if existing.file_size > file_size
                    || (existing.file_size == file_size && existing.mtime >= mtime) =>
            {
                continue;
            }
            _ => {
                sessions.insert(project_dir.clone(), candidate);
            }
        }
    }

    sessions
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn tail_text(session_path: &Path, max_bytes: u64) -> std::io::Result<String> {
    use std::io::{Seek, SeekFrom};

    let mut file = std::fs::File::open(session_path)?;
    let file_size = file.metadata()?.len();
    let read_size = max_bytes.min(file_size);
    if read_size < file_size {
        file.seek(SeekFrom::End(-(read_size as i64)))?;
    }
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `true` when the transcript's last well-formed line is a user turn — we
/// just replied and the agent hasn't produced output yet, so this tick
/// should skip the project.
pub fn is_last_message_from_user(session_path: &Path) -> bool {
    let Ok(content) = tail_text(session_path, TAIL_SCAN_BYTES_SMALL) else {
        return false;
    };

    for line in content.trim().lines().rev() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(data) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let msg_type = data.get("type").and_then(Value::as_str).unwrap_or("");

        match msg_type {
            "user_message" => return true,
            "response_item" => {
                let payload = data.get("payload");
                let role = payload.and_then(|p| p.get("role")).and_then(Value::as_str);
                let kind = payload.and_then(|p| p.get("type")).and_then(Value::as_str);
                if role == Some("user") && kind == Some("message") {
                    return true;
                }
                if role == Some("assistant") {
                    return false;
                }
            }
            "event_msg" | "turn_context" => continue,
            _ => break,
        }
    }
    false
}

/// Reverse-scans the transcript for the last `assistant` message and returns
/// its concatenated `output_text` segments, truncated to `max_chars`.
pub fn read_last_assistant_message(session_path: &Path, max_chars: usize) -> Option<String> {
    let content = tail_text(session_path, TAIL_SCAN_BYTES_LARGE).ok()?;

    for line in content.trim().lines().rev() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(data) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if data.get("type").and_then(Value::as_str) != Some("response_item") {
            continue;
        }
        let payload = data.get("payload")?;
        if payload.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        if payload.get("role").and_then(Value::as_str) != Some("assistant") {
            continue;
        }

        let texts: Vec<&str> = payload
            .get("content")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
            .filter_map(|c| c.get("text").and_then(Value::as_str))
            .collect();

        if texts.is_empty() {
            continue;
        }
        let full_text = texts.join("\n");
        return Some(if full_text.chars().count() > max_chars {
            full_text.chars().take(max_chars).collect()
        } else {
            full_text
        });
    }
    None
}

/// `now` is threaded in explicitly so tests can pin it; production callers
/// pass [`autopilot_core::Clock::now`].
pub fn session_age(session: &SessionInfo, now: SystemTime) -> std::time::Duration {
    session.age(now)
}
