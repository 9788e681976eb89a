// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composes the autopilot's reply to the agent for each classified intent.
//! Replies are terse nudges, not conversation — the agent already has the
//! transcript; these exist only to unstick it.

use autopilot_core::Intent;

fn generate_error_reply(text: &str) -> String {
    let lower = text.to_lowercase();
    let hint = if lower.contains("typescript") || lower.contains(" type") {
        "Check the type definitions and fix the type error, then continue."
    } else if lower.contains("import") || lower.contains("modulenotfounderror") {
        "Check whether the dependency is installed or the import path is correct, then continue."
    } else if lower.contains("build") || lower.contains("compile") {
        "Check the build/compile error and fix it, then continue."
    } else if lower.contains("test") && (lower.contains("fail") || lower.contains("failed")) {
        "Check the failing test and fix it, then continue."
    } else {
        "An error occurred — please check it and continue."
    };
    format!("{hint}\n\ncontinue the current task.")
}

fn generate_choice_reply() -> String {
    "Please pick the option you judge best and continue — no need to wait for confirmation."
        .to_string()
}

fn generate_confirm_reply() -> String {
    "Yes, continue.".to_string()
}

fn generate_complete_reply() -> String {
    "Good. Check whether there are remaining todo items; if not, do a full self-check and summary."
        .to_string()
}

fn generate_review_reply(text: &str) -> String {
    let blocking = text.matches("[BLOCK]").count() + text.matches("[CRITICAL]").count();
    if blocking > 0 {
        format!("There are {blocking} blocking findings — please fix them first, then continue.")
    } else {
        "Please address the review findings as appropriate, then continue.".to_string()
    }
}

fn generate_default_reply(text: &str) -> String {
    let is_question = text.trim_end().ends_with('?') || text.trim_end().ends_with('？');
    let mentions_summary = ["总结", "状态", "summary", "status"]
        .iter()
        .any(|kw| text.contains(kw));
    let mentions_file_creation = ["创建了", "写入了", "created", "wrote"]
        .iter()
        .any(|kw| text.contains(kw));

    if is_question {
        "Please answer based on your own judgement and continue.".to_string()
    } else if mentions_summary || mentions_file_creation {
        "Looks good, please continue.".to_string()
    } else {
        "继续。".to_string()
    }
}

/// Dispatches to the per-intent reply builder. `text` is the agent's last
/// message, used for keyword-driven hints on [`Intent::Error`]/[`Intent::Review`]/
/// [`Intent::Default`].
pub fn generate_reply(intent: Intent, text: &str) -> String {
    match intent {
        Intent::Error => generate_error_reply(text),
        Intent::Choice => generate_choice_reply(),
        Intent::Confirm => generate_confirm_reply(),
        Intent::TaskComplete => generate_complete_reply(),
        Intent::Review => generate_review_reply(text),
        Intent::Default => generate_default_reply(text),
    }
}

/// A nudge composed after dispatching the next task, distinct from an
/// intent-driven reply: tells the agent what changed and how much work
/// remains.
pub fn generate_push_reply(task_name: &str, completed: usize, total: usize) -> String {
    let remaining = total.saturating_sub(completed);
    format!(
        "Next up: {task_name}. Progress so far: {completed}/{total} tasks completed, {remaining} remaining."
    )
}
