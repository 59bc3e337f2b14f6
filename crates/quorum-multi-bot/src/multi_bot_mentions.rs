//! Mention extraction: reconciles the four addressing signal sources into
//! one ordered, de-duplicated list of addressed identity ids.
//!
//! Source precedence is fixed: structural self flag, inline mention
//! elements, reply target, then raw markup scanning. Downstream logic only
//! asks "is X addressed" and "who was addressed first", so insertion order
//! matters and duplicates are dropped on append.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::multi_bot_contract::MultiBotMessageEvent;

// `<at id="123"/>` with arbitrary extra attributes, and `<at>123</at>`.
fn markup_attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<at\s[^>]*?id="([^"]+)"[^>]*?/>"#).expect("hardcoded pattern compiles")
    })
}

fn markup_body_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<at>(\d+)</at>").expect("hardcoded pattern compiles"))
}

/// Extracts every addressed identity id from `event`, in source-precedence
/// order, de-duplicated. The structural self flag only ever asserts that the
/// evaluating identity itself was addressed, so it contributes `self_id`.
pub fn extract_mentioned_ids(event: &MultiBotMessageEvent, self_id: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut mentioned = Vec::new();
    let mut append = |id: &str| {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return;
        }
        if seen.insert(trimmed.to_string()) {
            mentioned.push(trimmed.to_string());
        }
    };

    let signals = &event.mention_signals;
    if signals.structural_self_flag {
        append(self_id);
    }
    for id in &signals.inline_mention_ids {
        append(id);
    }
    append(&signals.reply_target_id);
    for capture in markup_attribute_pattern().captures_iter(&signals.raw_markup_text) {
        if let Some(id) = capture.get(1) {
            append(id.as_str());
        }
    }
    for capture in markup_body_pattern().captures_iter(&signals.raw_markup_text) {
        if let Some(id) = capture.get(1) {
            append(id.as_str());
        }
    }
    mentioned
}
