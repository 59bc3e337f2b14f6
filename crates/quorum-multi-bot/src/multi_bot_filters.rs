//! Pure predicate evaluators for the source, command, and keyword filter
//! blocks. Each evaluator is total: malformed rules never matching is the
//! failure mode, not an error.

use serde_json::Value;

use crate::multi_bot_config::{
    CommandFilterBlock, FilterMode, KeywordDisabledPolicy, KeywordFilterBlock, SourceFilterBlock,
    SourceRule, SourceRuleKind,
};
use crate::multi_bot_contract::MultiBotMessageOrigin;

/// Evaluates the source filter block against a message origin.
///
/// Disabled, or enabled with zero rules, means no restriction. Otherwise the
/// rules are OR-ed and the mode decides whether a match passes or blocks.
pub fn evaluate_source_filter(origin: &MultiBotMessageOrigin, block: &SourceFilterBlock) -> bool {
    if !block.enabled || block.rules.is_empty() {
        return true;
    }
    let matched = block
        .rules
        .iter()
        .any(|rule| source_rule_matches(rule, origin));
    match block.mode {
        FilterMode::Whitelist => matched,
        FilterMode::Blacklist => !matched,
    }
}

/// Whether one source rule matches the origin. Unrecognized kinds and
/// non-coercible values contribute `false`.
pub fn source_rule_matches(rule: &SourceRule, origin: &MultiBotMessageOrigin) -> bool {
    let Some(kind) = SourceRuleKind::parse(&rule.kind) else {
        return false;
    };
    match kind {
        SourceRuleKind::Guild => value_equals_str(&rule.value, &origin.guild_id),
        SourceRuleKind::User => value_equals_str(&rule.value, &origin.user_id),
        SourceRuleKind::Channel => value_equals_str(&rule.value, &origin.channel_id),
        SourceRuleKind::Private => match coerce_bool(&rule.value) {
            Some(expected) => origin.is_direct == expected,
            None => false,
        },
    }
}

/// Evaluates the command filter for a command message.
///
/// Enabled with an empty rule list rejects everything: an operator who opted
/// into command filtering without naming commands wants nothing through until
/// an allow-list is added. The `mode` field is nominal; semantics are
/// list-membership.
pub fn evaluate_command_filter(command_name: &str, block: &CommandFilterBlock) -> bool {
    if !block.enabled {
        return true;
    }
    let permitted = block
        .commands
        .iter()
        .map(|command| command.trim())
        .filter(|command| !command.is_empty())
        .collect::<Vec<&str>>();
    if permitted.is_empty() {
        return false;
    }
    permitted.contains(&command_name.trim())
}

/// Evaluates the keyword filter for a non-command message.
///
/// A disabled block resolves through the identity's named disabled policy;
/// enabled with no keywords never matches. Matching is case-sensitive,
/// unanchored substring membership, so an empty keyword matches every
/// message.
pub fn evaluate_keyword_filter(text: &str, block: &KeywordFilterBlock) -> bool {
    if !block.enabled {
        return match block.disabled_policy {
            KeywordDisabledPolicy::RespondAll => true,
            KeywordDisabledPolicy::RespondNone => false,
        };
    }
    if block.keywords.is_empty() {
        return false;
    }
    let matched = block
        .keywords
        .iter()
        .any(|keyword| text.contains(keyword.as_str()));
    match block.mode {
        FilterMode::Whitelist => matched,
        FilterMode::Blacklist => !matched,
    }
}

fn value_equals_str(value: &Value, field: &str) -> bool {
    value.as_str().is_some_and(|expected| expected == field)
}

fn coerce_bool(value: &Value) -> Option<bool> {
    if let Some(flag) = value.as_bool() {
        return Some(flag);
    }
    match value.as_str()?.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn guild_origin() -> MultiBotMessageOrigin {
        MultiBotMessageOrigin {
            guild_id: "g-1".to_string(),
            user_id: "user-1".to_string(),
            channel_id: "chan-1".to_string(),
            is_direct: false,
        }
    }

    fn direct_origin() -> MultiBotMessageOrigin {
        MultiBotMessageOrigin {
            guild_id: String::new(),
            user_id: "user-1".to_string(),
            channel_id: "dm-1".to_string(),
            is_direct: true,
        }
    }

    fn rule(kind: &str, value: serde_json::Value) -> SourceRule {
        SourceRule {
            kind: kind.to_string(),
            value,
        }
    }

    #[test]
    fn unit_disabled_source_block_ignores_rule_contents() {
        let block = SourceFilterBlock {
            enabled: false,
            mode: FilterMode::Whitelist,
            rules: vec![rule("guild", json!("other-guild"))],
        };
        assert!(evaluate_source_filter(&guild_origin(), &block));
    }

    #[test]
    fn unit_enabled_source_block_with_no_rules_passes_everything() {
        let block = SourceFilterBlock {
            enabled: true,
            mode: FilterMode::Blacklist,
            rules: Vec::new(),
        };
        assert!(evaluate_source_filter(&guild_origin(), &block));
    }

    #[test]
    fn unit_blacklist_mode_is_exact_negation_of_whitelist() {
        let rules = vec![
            rule("guild", json!("g-1")),
            rule("user", json!("someone-else")),
        ];
        let whitelist = SourceFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            rules: rules.clone(),
        };
        let blacklist = SourceFilterBlock {
            enabled: true,
            mode: FilterMode::Blacklist,
            rules,
        };
        for origin in [guild_origin(), direct_origin()] {
            assert_eq!(
                evaluate_source_filter(&origin, &whitelist),
                !evaluate_source_filter(&origin, &blacklist)
            );
        }
    }

    #[test]
    fn unit_private_rule_coerces_string_value_case_insensitively() {
        assert!(source_rule_matches(
            &rule("private", json!("True")),
            &direct_origin()
        ));
        assert!(source_rule_matches(
            &rule("private", json!(false)),
            &guild_origin()
        ));
        assert!(!source_rule_matches(
            &rule("private", json!("maybe")),
            &direct_origin()
        ));
    }

    #[test]
    fn unit_unrecognized_rule_kind_never_matches() {
        let block = SourceFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            rules: vec![rule("team", json!("g-1")), rule("guild", json!("g-1"))],
        };
        // The malformed rule contributes false; the valid sibling still matches.
        assert!(evaluate_source_filter(&guild_origin(), &block));
        let only_malformed = SourceFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            rules: vec![rule("team", json!("g-1"))],
        };
        assert!(!evaluate_source_filter(&guild_origin(), &only_malformed));
    }

    #[test]
    fn unit_command_filter_disabled_passes_everything() {
        let block = CommandFilterBlock::default();
        assert!(evaluate_command_filter("anything", &block));
    }

    #[test]
    fn unit_command_filter_enabled_with_empty_rules_rejects_every_command() {
        let block = CommandFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            commands: Vec::new(),
        };
        for command in ["ping", "status", ""] {
            assert!(!evaluate_command_filter(command, &block));
        }
    }

    #[test]
    fn unit_command_filter_is_list_membership_regardless_of_mode() {
        for mode in [FilterMode::Whitelist, FilterMode::Blacklist] {
            let block = CommandFilterBlock {
                enabled: true,
                mode,
                commands: vec!["status".to_string(), String::new()],
            };
            assert!(evaluate_command_filter("status", &block));
            assert!(!evaluate_command_filter("ping", &block));
        }
    }

    #[test]
    fn unit_keyword_filter_disabled_follows_named_policy() {
        let permissive = KeywordFilterBlock::default();
        assert!(evaluate_keyword_filter("hello", &permissive));

        let strict = KeywordFilterBlock {
            disabled_policy: KeywordDisabledPolicy::RespondNone,
            ..Default::default()
        };
        assert!(!evaluate_keyword_filter("hello", &strict));
    }

    #[test]
    fn unit_keyword_filter_enabled_with_empty_list_never_matches() {
        let block = KeywordFilterBlock {
            enabled: true,
            ..Default::default()
        };
        assert!(!evaluate_keyword_filter("hello", &block));
    }

    #[test]
    fn functional_keyword_matching_is_case_sensitive_substring() {
        let block = KeywordFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            keywords: vec!["Help".to_string()],
            disabled_policy: KeywordDisabledPolicy::RespondAll,
        };
        assert!(evaluate_keyword_filter("need Helping hand", &block));
        assert!(!evaluate_keyword_filter("need help", &block));

        let blacklist = KeywordFilterBlock {
            mode: FilterMode::Blacklist,
            ..block
        };
        assert!(!evaluate_keyword_filter("need Helping hand", &blacklist));
        assert!(evaluate_keyword_filter("need help", &blacklist));
    }

    #[test]
    fn regression_empty_keyword_matches_every_message() {
        let block = KeywordFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            keywords: vec![String::new()],
            disabled_policy: KeywordDisabledPolicy::RespondAll,
        };
        assert!(evaluate_keyword_filter("hello", &block));
        assert!(evaluate_keyword_filter("", &block));

        let blacklist = KeywordFilterBlock {
            mode: FilterMode::Blacklist,
            ..block
        };
        assert!(!evaluate_keyword_filter("hello", &blacklist));
    }

    #[test]
    fn regression_command_rule_entries_are_trimmed_before_comparison() {
        let block = CommandFilterBlock {
            enabled: true,
            mode: FilterMode::Whitelist,
            commands: vec!["status ".to_string()],
        };
        assert!(evaluate_command_filter("status", &block));
        assert!(evaluate_command_filter(" status ", &block));
        assert!(!evaluate_command_filter("statuses", &block));
    }
}
