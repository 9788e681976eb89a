// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classifies an agent's last transcript message into one of six intents,
//! by literal keyword/regex presence — no LLM call, no tokenization.
//! Priority order: error -> choice -> confirm -> review -> task-complete ->
//! default. Review is checked ahead of completion because review reports
//! routinely contain "done"-shaped language but the operator's real need is
//! the review feedback, not a completion notice.

use autopilot_core::Intent;
use regex::Regex;
use std::sync::OnceLock;

const ERROR_KEYWORDS: &[&str] = &[
    "error", "Error", "ERROR", "错误", "失败", "报错", "failed", "Failed", "FAILED", "Cannot",
    "cannot", "can't", "Can't", "TypeError", "SyntaxError", "ImportError",
    "ModuleNotFoundError", "ReferenceError", "RuntimeError", "ValueError", "KeyError",
    "AttributeError", "NameError", "IndentationError", "Exception", "Traceback", "编译失败",
    "构建失败", "build failed", "npm ERR", "yarn error", "pnpm ERR",
];

const RESOLVED_KEYWORDS: &[&str] = &[
    "已修复", "已解决", "修复了", "解决了", "fixed", "Fixed", "FIXED", "resolved", "Resolved",
    "RESOLVED", "已处理", "处理完成", "successfully", "Successfully", "通过", "passed", "Passed",
];

const CONFIRM_KEYWORDS: &[&str] = &[
    "是否继续", "要不要", "确认", "确定", "proceed", "Proceed", "continue?", "Continue?",
    "shall I", "Shall I", "可以吗", "好吗", "行吗", "是否", "是否要", "要继续吗", "继续吗",
    "你确定", "确定要", "需要修改的吗", "需要调整的吗", "需要改的吗", "有什么需要", "还有什么",
    "what do you think", "What do you think", "any feedback", "Any feedback", "let me know",
    "Let me know", "should I proceed", "Should I proceed",
];

const COMPLETION_KEYWORDS: &[&str] = &[
    "完成", "已完成", "全部完成", "done", "Done", "DONE", "completed", "Completed", "COMPLETED",
    "已实现", "实现完成", "all tasks", "All tasks", "所有任务", "任务完成", "已经完成", "都完成了",
    "finished", "Finished", "成功完成", "顺利完成", "所有测试通过", "tests passing",
    "tests passed", "已解决", "已修复", "继续下一步",
];

const REVIEW_MARKERS: &[&str] = &[
    "[block]", "[changes]", "[finding]", "[p0]", "[p1]", "[p2]", "[p3]", "[bug]", "[issue]",
    "[warning]", "[critical]", "[high]", "[medium]", "[low]", "::code-comment", "priority=",
    "新发现", "优化建议", "改进建议", "审查结果", "代码审查",
];

struct ChoicePatterns {
    combo_option: Regex,
    colon_then_list: Regex,
    or_question: Regex,
    english_prompt: Regex,
    chinese_prompt: Regex,
    option_letters: Regex,
}

fn choice_patterns() -> &'static ChoicePatterns {
    static PATTERNS: OnceLock<ChoicePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ChoicePatterns {
        combo_option: Regex::new(r"(?i)方案[一二三ABCD123].*(方案[一二三ABCD123]|或者|还是)").unwrap(),
        colon_then_list: Regex::new(r"(?i)(选择|选项|方案)\s*[:：]\s*\n").unwrap(),
        or_question: Regex::new(r"(?i)(还是|或者).*(呢|吗|？|\?)").unwrap(),
        english_prompt: Regex::new(r"(?i)(should I|would you prefer|which one|which option)")
            .unwrap(),
        chinese_prompt: Regex::new(r"(?i)(请选择|你选择|你决定|你来决定)").unwrap(),
        option_letters: Regex::new(r"(?i)(option [a-d]).*(option [a-d])").unwrap(),
    })
}

fn review_review_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"review\s*(结果|后|发现|建议|:)").unwrap())
}

fn review_code_review_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(code|代码)\s*review").unwrap())
}

fn incomplete_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(未开始|未完成|0%|\d+%.*未)").unwrap())
}

fn partial_percent_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"完成\s*\d+%").unwrap())
}

fn is_in_quote_or_comment(text: &str, keyword: &str) -> bool {
    for line in text.lines() {
        if line.contains(keyword) {
            let trimmed = line.trim_start();
            if trimmed.starts_with('>')
                || trimmed.starts_with("//")
                || trimmed.starts_with('#')
                || trimmed.starts_with('*')
                || trimmed.starts_with("```")
            {
                return true;
            }
        }
    }
    false
}

fn has_error(text: &str) -> bool {
    let mut found_error = false;

    'outer: for &keyword in ERROR_KEYWORDS {
        if text.contains(keyword) && !is_in_quote_or_comment(text, keyword) {
            for line in text.lines() {
                if line.contains(keyword) {
                    let resolved_on_line =
                        RESOLVED_KEYWORDS.iter().any(|r| line.contains(r));
                    if !resolved_on_line {
                        found_error = true;
                        break 'outer;
                    }
                }
            }
        }
    }

    if !found_error {
        return false;
    }

    // A resolved-keyword appearing before the (first) error keyword in the
    // text reads as "already fixed" framing, overriding the error signal.
    for &resolved in RESOLVED_KEYWORDS {
        if let Some(resolved_pos) = text.find(resolved) {
            for &error in ERROR_KEYWORDS {
                if let Some(error_pos) = text.find(error) {
                    if resolved_pos < error_pos {
                        return false;
                    }
                }
            }
        }
    }

    true
}

fn has_choice(text: &str) -> bool {
    let p = choice_patterns();
    p.combo_option.is_match(text)
        || p.colon_then_list.is_match(text)
        || p.or_question.is_match(text)
        || p.english_prompt.is_match(text)
        || p.chinese_prompt.is_match(text)
        || p.option_letters.is_match(text)
}

fn has_confirm(text: &str) -> bool {
    CONFIRM_KEYWORDS.iter().any(|k| text.contains(k))
}

fn has_completion(text: &str) -> bool {
    let has_incomplete = incomplete_pattern().is_match(text);
    let has_partial = partial_percent_pattern().is_match(text);
    if has_incomplete && has_partial {
        return false;
    }
    COMPLETION_KEYWORDS.iter().any(|k| text.contains(k))
}

fn has_review(text: &str) -> bool {
    let lower = text.to_lowercase();
    for &marker in REVIEW_MARKERS {
        if lower.contains(marker) {
            return true;
        }
    }
    review_review_pattern().is_match(&lower) || review_code_review_pattern().is_match(&lower)
}

/// Classifies `text` (typically the agent's last transcript message). Empty
/// or missing input is [`Intent::Default`].
pub fn analyze_intent(text: Option<&str>) -> Intent {
    let Some(text) = text else {
        return Intent::Default;
    };
    if text.is_empty() {
        return Intent::Default;
    }

    if has_error(text) {
        return Intent::Error;
    }
    if has_choice(text) {
        return Intent::Choice;
    }
    if has_confirm(text) {
        return Intent::Confirm;
    }
    if has_review(text) {
        return Intent::Review;
    }
    if has_completion(text) {
        return Intent::TaskComplete;
    }
    Intent::Default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_input_is_default() {
        assert_eq!(analyze_intent(None), Intent::Default);
    }

    #[test]
    fn detects_error() {
        assert_eq!(
            analyze_intent(Some("TypeError: cannot read property 'x'")),
            Intent::Error
        );
    }

    #[test]
    fn resolved_error_is_not_error() {
        assert_eq!(
            analyze_intent(Some("fixed the TypeError already, all good now")),
            Intent::Default
        );
    }

    #[test]
    fn error_in_code_comment_is_excluded() {
        assert_eq!(
            analyze_intent(Some("// TODO: handle this error case later\nLooks good.")),
            Intent::Default
        );
    }

    #[test]
    fn detects_choice_english() {
        assert_eq!(
            analyze_intent(Some("Which option do you prefer, A or B?")),
            Intent::Choice
        );
    }

    #[test]
    fn detects_confirm() {
        assert_eq!(
            analyze_intent(Some("Should I proceed with the migration?")),
            Intent::Confirm
        );
    }

    #[test]
    fn review_outranks_completion() {
        assert_eq!(
            analyze_intent(Some("[CRITICAL] auth bypass found. Fix is done.")),
            Intent::Review
        );
    }

    #[test]
    fn detects_task_complete() {
        assert_eq!(
            analyze_intent(Some("All tasks completed, tests passing.")),
            Intent::TaskComplete
        );
    }

    #[test]
    fn progress_report_is_not_complete() {
        assert_eq!(
            analyze_intent(Some("完成 50%，未完成的部分还在进行中")),
            Intent::Default
        );
    }

    #[test]
    fn plain_text_is_default() {
        assert_eq!(analyze_intent(Some("Working on it.")), Intent::Default);
    }
}
