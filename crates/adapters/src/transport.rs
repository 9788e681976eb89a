// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivers replies into a running Codex session: tmux `send-keys` into the
//! project's pane (visible in the TUI) with a non-interactive `codex exec
//! resume` fallback.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

pub const TMUX_SESSION: &str = "autopilot";

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tmux_path: String,
    pub codex_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tmux_path: "/opt/homebrew/bin/tmux".to_string(),
            codex_path: "/opt/homebrew/bin/codex".to_string(),
        }
    }
}

const SHELL_COMMANDS: &[&str] = &["bash", "zsh", "sh", "fish"];

fn run(cmd: &mut Command, timeout: Duration) -> Option<std::process::Output> {
    // std::process::Command has no native timeout; `timeout` documents the
    // budget these short, local tmux/codex invocations are expected to
    // respect on their own.
    let _ = timeout;
    cmd.output().ok()
}

pub fn has_session(tmux_path: &str) -> bool {
    run(
        Command::new(tmux_path).args(["has-session", "-t", TMUX_SESSION]),
        Duration::from_secs(5),
    )
    .map(|out| out.status.success())
    .unwrap_or(false)
}

pub fn list_windows(tmux_path: &str) -> Vec<String> {
    let Some(out) = run(
        Command::new(tmux_path).args(["list-windows", "-t", TMUX_SESSION, "-F", "#{window_name}"]),
        Duration::from_secs(5),
    ) else {
        return Vec::new();
    };
    if !out.status.success() {
        return Vec::new();
    }
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn pane_current_command(tmux_path: &str, window_name: &str) -> Option<String> {
    let target = format!("{TMUX_SESSION}:{window_name}");
    let out = run(
        Command::new(tmux_path).args(["list-panes", "-t", &target, "-F", "#{pane_current_command}"]),
        Duration::from_secs(5),
    )?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .map(str::to_string)
}

/// `true` when the pane's current foreground process isn't a bare shell —
/// i.e. codex (or some other agent process) is actually running there.
pub fn is_pane_running_codex(tmux_path: &str, window_name: &str) -> bool {
    match pane_current_command(tmux_path, window_name) {
        Some(cmd) => !SHELL_COMMANDS.contains(&cmd.as_str()),
        None => false,
    }
}

pub fn capture_pane(tmux_path: &str, window_name: &str, lines: u32) -> Option<String> {
    let target = format!("{TMUX_SESSION}:{window_name}");
    let scrollback = format!("-{lines}");
    let out = run(
        Command::new(tmux_path).args(["capture-pane", "-t", &target, "-p", "-S", &scrollback]),
        Duration::from_secs(5),
    )?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Sends `reply` into `window_name`'s pane via `tmux send-keys`. Refuses if
/// the window is missing or codex isn't running there, to avoid typing a
/// reply into a bare shell prompt.
pub fn send_reply_via_tmux(config: &TransportConfig, reply: &str, window_name: &str) -> bool {
    let windows = list_windows(&config.tmux_path);
    if !windows.iter().any(|w| w == window_name) {
        tracing::error!(window = window_name, "tmux window does not exist");
        return false;
    }
    if !is_pane_running_codex(&config.tmux_path, window_name) {
        tracing::error!(window = window_name, "codex is not running in this pane, refusing to send");
        return false;
    }

    // Codex's TUI input doesn't accept multiline text; flatten before sending.
    let single_line = reply.replace(['\n', '\r'], " ");
    let single_line = single_line.trim();
    let target = format!("{TMUX_SESSION}:{window_name}");

    let Some(out) = run(
        Command::new(&config.tmux_path).args(["send-keys", "-t", &target, "-l", single_line]),
        Duration::from_secs(10),
    ) else {
        return false;
    };
    if !out.status.success() {
        tracing::error!(stderr = %String::from_utf8_lossy(&out.stderr), "tmux send-keys (text) failed");
        return false;
    }

    std::thread::sleep(Duration::from_millis(100));

    let Some(out) = run(
        Command::new(&config.tmux_path).args(["send-keys", "-t", &target, "Enter"]),
        Duration::from_secs(5),
    ) else {
        return false;
    };
    if !out.status.success() {
        tracing::error!(stderr = %String::from_utf8_lossy(&out.stderr), "tmux send-keys (Enter) failed");
        return false;
    }

    true
}

/// Non-interactive fallback: detaches a `codex exec resume` process, waiting
/// briefly for an immediate failure before treating the launch as a success.
pub fn send_reply_via_cli(
    config: &TransportConfig,
    reply: &str,
    session_id: &str,
    project_dir: Option<&Path>,
) -> bool {
    let cwd = project_dir
        .map(Path::to_path_buf)
        .or_else(dirs_home)
        .unwrap_or_else(|| Path::new(".").to_path_buf());

    let child = Command::new(&config.codex_path)
        .args(["exec", "resume", session_id, reply, "--full-auto"])
        .current_dir(cwd)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .spawn();

    match child {
        Ok(mut child) => {
            // Give codex a moment to fail fast (bad session id, missing binary);
            // anything still running after this is presumed healthy background work.
            std::thread::sleep(Duration::from_millis(200));
            match child.try_wait() {
                Ok(Some(status)) if !status.success() => false,
                _ => true,
            }
        }
        Err(_) => false,
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}

/// Tiered dispatch: tmux send-keys first (visible in the TUI), falling back
/// to `codex exec resume` only when no tmux session exists or the send
/// failed and a `session_id` is available.
pub fn send_reply(
    config: &TransportConfig,
    reply: &str,
    project_name: &str,
    session_id: Option<&str>,
    project_dir: Option<&Path>,
) -> bool {
    if has_session(&config.tmux_path) {
        if send_reply_via_tmux(config, reply, project_name) {
            return true;
        }
        tracing::warn!("tmux send failed, trying CLI fallback");
    } else {
        tracing::warn!("autopilot tmux session does not exist");
    }

    match session_id {
        Some(id) => send_reply_via_cli(config, reply, id, project_dir),
        None => {
            tracing::error!("send failed: no tmux session and no session_id for CLI fallback");
            false
        }
    }
}

/// Polls `session_path`'s file size for growth, confirming the agent
/// actually responded. Blocking — callers run this off the tick's hot path.
pub fn verify_send(session_path: &Path, poll_interval: Duration, max_wait: Duration) -> bool {
    let Ok(original_size) = std::fs::metadata(session_path).map(|m| m.len()) else {
        return false;
    };

    let attempts = (max_wait.as_secs() / poll_interval.as_secs().max(1)).max(1);
    for _ in 0..attempts {
        std::thread::sleep(poll_interval);
        if let Ok(size) = std::fs::metadata(session_path).map(|m| m.len()) {
            if size > original_size {
                return true;
            }
        }
    }
    false
}

/// One window to provision: `(project_name, project_dir, session_id)`.
pub struct WindowSpec<'a> {
    pub name: &'a str,
    pub project_dir: &'a Path,
    pub session_id: &'a str,
}

/// Creates the shared `autopilot` tmux session (if missing) with one window
/// per project, resuming each project's codex session. Never restarts a
/// window whose codex process has already exited — that's left for the
/// scheduler's ordinary dispatch to handle.
pub fn setup_tmux_session(config: &TransportConfig, projects: &[WindowSpec<'_>]) -> bool {
    if projects.is_empty() {
        return false;
    }

    let mut session_exists = has_session(&config.tmux_path);
    let existing_windows = if session_exists {
        list_windows(&config.tmux_path)
    } else {
        Vec::new()
    };

    for (i, spec) in projects.iter().enumerate() {
        if existing_windows.iter().any(|w| w == spec.name) {
            continue;
        }

        let codex_cmd = format!(
            "cd {} && {} resume {} --full-auto",
            spec.project_dir.display(),
            config.codex_path,
            spec.session_id
        );

        if !session_exists && i == 0 {
            let _ = run(
                Command::new(&config.tmux_path).args([
                    "new-session",
                    "-d",
                    "-s",
                    TMUX_SESSION,
                    "-n",
                    spec.name,
                    "-c",
                    &spec.project_dir.to_string_lossy(),
                ]),
                Duration::from_secs(5),
            );
            session_exists = true;
        } else {
            let _ = run(
                Command::new(&config.tmux_path).args([
                    "new-window",
                    "-t",
                    TMUX_SESSION,
                    "-n",
                    spec.name,
                    "-c",
                    &spec.project_dir.to_string_lossy(),
                ]),
                Duration::from_secs(5),
            );
        }

        let target = format!("{TMUX_SESSION}:{}", spec.name);
        let _ = run(
            Command::new(&config.tmux_path).args(["send-keys", "-t", &target, &codex_cmd, "Enter"]),
            Duration::from_secs(5),
        );

        std::thread::sleep(Duration::from_secs(1));
    }

    true
}
