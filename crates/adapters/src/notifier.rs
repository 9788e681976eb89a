// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telegram push notifications: MarkdownV2 with an escaped-then-plain-text
//! fallback chain, so a formatting mistake never loses the notification.

use regex::Regex;
use std::sync::OnceLock;

fn code_fence_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("valid regex"))
}

fn inline_code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"`[^`]+`").expect("valid regex"))
}

fn bold_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"))
}

fn italic_star_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\*([^*]+)\*").expect("valid regex"))
}

fn bold_underscore_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"__([^_]+)__").expect("valid regex"))
}

fn italic_underscore_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"_([^_]+)_").expect("valid regex"))
}

fn link_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"))
}

fn heading_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"(?m)^#+\s*").expect("valid regex"))
}

/// Reduces markdown to plain text: drops code fences/inline code, unwraps
/// emphasis and links, strips heading markers.
pub fn strip_markdown(text: &str) -> String {
    let text = code_fence_pattern().replace_all(text, "").into_owned();
    let text = inline_code_pattern().replace_all(&text, "").into_owned();
    let text = bold_pattern().replace_all(&text, "$1").into_owned();
    let text = italic_star_pattern().replace_all(&text, "$1").into_owned();
    let text = bold_underscore_pattern().replace_all(&text, "$1").into_owned();
    let text = italic_underscore_pattern().replace_all(&text, "$1").into_owned();
    let text = link_pattern().replace_all(&text, "$1").into_owned();
    let text = heading_pattern().replace_all(&text, "").into_owned();
    text.trim().to_string()
}

const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            chat_id: chat_id.to_string(),
        }
    }

    async fn send_with_parse_mode(&self, text: &str, parse_mode: Option<&str>) -> bool {
        let url = format!("{}/sendMessage", self.api_base);
        let mut payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = serde_json::Value::from(mode);
        }

        match self.client.post(&url).json(&payload).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                tracing::warn!(error = %err, "telegram send failed");
                false
            }
        }
    }

    /// MarkdownV2 as-is, then escaped, then plain text — whichever the
    /// Telegram API accepts first.
    pub async fn notify(&self, text: &str) -> bool {
        if self.send_with_parse_mode(text, Some("MarkdownV2")).await {
            return true;
        }
        let escaped = escape_markdown_v2(text);
        if self.send_with_parse_mode(&escaped, Some("MarkdownV2")).await {
            return true;
        }
        let plain = strip_markdown(text);
        self.send_with_parse_mode(&plain, None).await
    }

    pub async fn send_simple(&self, text: &str) -> bool {
        self.send_with_parse_mode(text, None).await
    }
}

pub fn format_send_notification(project_name: &str, reply: &str, intent: &str) -> String {
    let truncated: String = reply.chars().take(200).collect();
    let ellipsis = if reply.chars().count() > 200 { "..." } else { "" };
    format!("\u{1f4e4} Autopilot | {project_name}\n\nintent: {intent}\nsent:\n> {truncated}{ellipsis}")
}

pub fn format_error_notification(project_name: &str, error: &str) -> String {
    format!("\u{274c} Autopilot error | {project_name}\n\n{error}")
}

#[allow(clippy::too_many_arguments)]
pub fn format_status_notification(
    project_name: &str,
    current_task: &str,
    progress: &str,
    codex_status: &str,
    runtime: &str,
    daily_sends: u32,
    max_sends: u32,
) -> String {
    format!(
        "\u{1f4ca} Autopilot status | {project_name}\n\ncurrent task: {current_task}\nprogress: {progress}\ncodex: {codex_status}\n\nruntime: {runtime} | sends today: {daily_sends}/{max_sends}"
    )
}
