// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator command bus: long-polls Telegram `getUpdates`, parses
//! `/command[@project] args...` text, and dispatches to state mutations.
//!
//! Command handlers live in the daemon crate (they need the full project
//! list, engine, and storage types); this module owns polling, parsing, and
//! reply formatting only.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub project_name: Option<String>,
    pub args: Vec<String>,
    pub chat_id: String,
    pub message_id: i64,
    pub from_user: String,
}

pub const SUPPORTED_COMMANDS: &[&str] = &[
    "status", "pause", "resume", "skip", "approve", "retry", "tasks", "log",
];

fn command_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"^/(\w+)(?:@\w+)?\s*(?:@(\S+))?\s*(.*)$").expect("valid regex")
    })
}

/// Parses a single Telegram message's text into a `Command`. Returns `None`
/// for text that isn't a slash command at all (the caller already filters
/// on a leading `/` before calling this, but defense in depth is cheap).
pub fn parse_command(
    text: &str,
    chat_id: &str,
    message_id: i64,
    from_user: &str,
) -> Option<Command> {
    let caps = command_pattern().captures(text.trim())?;
    let name = caps.get(1)?.as_str().to_lowercase();
    let project_name = caps.get(2).map(|m| m.as_str().to_string());
    let args_str = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
    let args = if args_str.is_empty() {
        Vec::new()
    } else {
        args_str.split_whitespace().map(str::to_string).collect()
    };

    Some(Command {
        name,
        project_name,
        args,
        chat_id: chat_id.to_string(),
        message_id,
        from_user: from_user.to_string(),
    })
}

pub struct CommandBus {
    client: reqwest::Client,
    api_base: String,
    allowed_chat_ids: Vec<String>,
    last_update_id: i64,
}

impl CommandBus {
    pub fn new(bot_token: &str, allowed_chat_ids: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            allowed_chat_ids,
            last_update_id: 0,
        }
    }

    /// Long-polls `getUpdates` with a server-side `timeout` (seconds, 0 =
    /// immediate return) and parses any slash commands found. Advances the
    /// update offset so the same update is never processed twice.
    pub async fn poll_commands(&mut self, timeout_secs: u64) -> Vec<Command> {
        let url = format!("{}/getUpdates", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("offset", (self.last_update_id + 1).to_string()),
                ("limit", "10".to_string()),
                ("timeout", timeout_secs.to_string()),
            ])
            .timeout(std::time::Duration::from_secs(timeout_secs + 10))
            .send()
            .await;

        let body: serde_json::Value = match response {
            Ok(resp) => match resp.json().await {
                Ok(v) => v,
                Err(_) => return Vec::new(),
            },
            Err(err) => {
                if !err.is_timeout() {
                    tracing::warn!(error = %err, "polling telegram failed");
                }
                return Vec::new();
            }
        };

        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            tracing::warn!(?body, "telegram API returned an error");
            return Vec::new();
        }

        let mut commands = Vec::new();
        let updates = body.get("result").and_then(|v| v.as_array()).cloned().unwrap_or_default();

        for update in updates {
            if let Some(update_id) = update.get("update_id").and_then(|v| v.as_i64()) {
                if update_id > self.last_update_id {
                    self.last_update_id = update_id;
                }
            }

            let message = update.get("message").cloned().unwrap_or_default();
            let Some(text) = message.get("text").and_then(|v| v.as_str()) else {
                continue;
            };
            if !text.starts_with('/') {
                continue;
            }

            let chat_id = message
                .get("chat")
                .and_then(|c| c.get("id"))
                .map(|v| v.to_string())
                .unwrap_or_default();
            if !self.allowed_chat_ids.is_empty() && !self.allowed_chat_ids.contains(&chat_id) {
                continue;
            }

            let message_id = message.get("message_id").and_then(|v| v.as_i64()).unwrap_or(0);
            let from_user = message
                .get("from")
                .and_then(|f| f.get("username"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            if let Some(cmd) = parse_command(text, &chat_id, message_id, &from_user) {
                if SUPPORTED_COMMANDS.contains(&cmd.name.as_str()) {
                    commands.push(cmd);
                }
            }
        }

        commands
    }

    pub async fn send_reply(&self, chat_id: &str, text: &str, reply_to: Option<i64>) -> bool {
        let url = format!("{}/sendMessage", self.api_base);
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(id) = reply_to {
            payload["reply_to_message_id"] = serde_json::Value::from(id);
        }

        match self.client.post(&url).json(&payload).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::warn!(error = %err, "replying via telegram failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_extracts_name_project_and_args() {
        let cmd = parse_command("/pause @myapp now please", "42", 7, "alice").unwrap();
        assert_eq!(cmd.name, "pause");
        assert_eq!(cmd.project_name.as_deref(), Some("myapp"));
        assert_eq!(cmd.args, vec!["now", "please"]);
        assert_eq!(cmd.chat_id, "42");
    }

    #[test]
    fn parse_command_without_project() {
        let cmd = parse_command("/status", "1", 1, "bob").unwrap();
        assert_eq!(cmd.name, "status");
        assert!(cmd.project_name.is_none());
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn parse_command_strips_botname_suffix() {
        let cmd = parse_command("/status@my_bot @proj", "1", 1, "bob").unwrap();
        assert_eq!(cmd.name, "status");
        assert_eq!(cmd.project_name.as_deref(), Some("proj"));
    }

    #[test]
    fn parse_command_rejects_non_command_text() {
        assert!(parse_command("hello there", "1", 1, "bob").is_none());
    }

    #[test]
    fn parse_command_lowercases_name() {
        let cmd = parse_command("/STATUS", "1", 1, "bob").unwrap();
        assert_eq!(cmd.name, "status");
    }

    #[yare::parameterized(
        plain = { "/skip myapp", "skip", None, vec!["myapp"] },
        targeted = { "/skip @myapp", "skip", Some("myapp"), vec![] },
        targeted_with_args = { "/approve @myapp final pass", "approve", Some("myapp"), vec!["final", "pass"] },
        botname_suffix_no_args = { "/tasks@ops_bot", "tasks", None, vec![] },
    )]
    fn parse_command_shapes(text: &str, expected_name: &str, expected_project: Option<&str>, expected_args: Vec<&str>) {
        let cmd = parse_command(text, "1", 1, "bob").unwrap();
        assert_eq!(cmd.name, expected_name);
        assert_eq!(cmd.project_name.as_deref(), expected_project);
        assert_eq!(cmd.args, expected_args);
    }
}
