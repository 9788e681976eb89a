//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for driving the `autopilot` CLI against an
//! isolated config directory, one tick at a time.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// `CARGO_MANIFEST_DIR` is stale (e.g. a shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn autopilot_binary() -> PathBuf {
    binary_path("autopilot")
}

pub fn autopilot_cmd() -> Command {
    Command::new(autopilot_binary())
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level builder for fluent test assertions over `autopilot` invocations.
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = autopilot_cmd();
        cmd.args(&self.args);
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout should not contain '{unexpected}'\nstdout: {stdout}");
        self
    }
}

/// Poll a condition until it returns true or the timeout elapses.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// An isolated config directory plus one registered project directory.
pub struct Project {
    config_dir: tempfile::TempDir,
    project_dir: tempfile::TempDir,
}

impl Project {
    /// A project with no manifest — schedule-only mode.
    pub fn empty() -> Self {
        Self {
            config_dir: tempfile::tempdir().unwrap(),
            project_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Writes `config.yaml` registering this project's directory.
    pub fn configure(&self, extra: &str) {
        let project_dir = self.path().display();
        std::fs::write(
            self.config_path().join("config.yaml"),
            format!("project_dirs:\n  - {project_dir}\n{extra}"),
        )
        .unwrap();
    }

    /// Writes `.autopilot/tasks.yaml` in the project directory.
    pub fn manifest(&self, yaml: &str) {
        let dir = self.path().join(".autopilot");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tasks.yaml"), yaml).unwrap();
    }

    /// Writes a file relative to the project directory.
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Reads and parses the persisted state document.
    pub fn state(&self) -> autopilot_storage::GlobalState {
        let path = self.config_path().join("state.json");
        autopilot_storage::GlobalState::load(&path).unwrap()
    }

    /// Runs `autopilot` scoped to this project's isolated config directory.
    pub fn autopilot(&self) -> CliBuilder {
        cli().env("AUTOPILOT_CONFIG_DIR", self.config_path())
    }
}

/// A linear three-task manifest matching the "linear DAG advance" scenario.
pub const LINEAR_CHAIN_MANIFEST: &str = r#"
tasks:
  - id: A
    name: "Task A"
    prompt: "Do task A."
    done_when:
      files:
        - path: "A.out"
          min_size: 1
  - id: B
    name: "Task B"
    prompt: "Do task B."
    depends_on: ["A"]
  - id: C
    name: "Task C"
    prompt: "Do task C."
    depends_on: ["B"]
"#;
