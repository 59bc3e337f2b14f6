//! Reporting and introspection helpers for operator tooling.
//!
//! Everything here is advisory and read-only: the command catalog feeds
//! allow-list configuration UIs, the render helpers back human-readable
//! status commands. None of it feeds back into the decision engine.

use serde_json::{json, Value};

use quorum_core::current_unix_timestamp_ms;

use crate::multi_bot_config::{MultiBotConfigFile, MultiBotIdentityConfig};

/// Trait contract for `CommandCatalog` behavior.
///
/// Hosts expose the live command table through this; the engine only reads
/// names, never dispatches.
pub trait CommandCatalog {
    fn command_names(&self) -> Vec<String>;
}

/// Configured command rules that do not appear in the host's command table,
/// as `(identity ref, command name)` pairs. Useful for flagging stale
/// allow-list entries in a configuration UI.
pub fn unknown_command_rules(
    config: &MultiBotConfigFile,
    catalog: &dyn CommandCatalog,
) -> Vec<(String, String)> {
    let known = catalog
        .command_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect::<Vec<String>>();
    let mut unknown = Vec::new();
    for identity in &config.identities {
        for command in &identity.command_filter.commands {
            let trimmed = command.trim();
            if trimmed.is_empty() || known.iter().any(|name| name == trimmed) {
                continue;
            }
            let entry = (identity.identity_ref(), trimmed.to_string());
            if !unknown.contains(&entry) {
                unknown.push(entry);
            }
        }
    }
    unknown
}

/// Identity refs seen live on the platform that have no configuration entry.
pub fn unconfigured_identity_refs(config: &MultiBotConfigFile, seen: &[(String, String)]) -> Vec<String> {
    let mut missing = Vec::new();
    for (platform, self_id) in seen {
        if config.config_for(platform, self_id).is_none() {
            let identity_ref = crate::multi_bot_config::identity_ref(platform, self_id);
            if !missing.contains(&identity_ref) {
                missing.push(identity_ref);
            }
        }
    }
    missing
}

/// One line per configured identity, configuration order.
pub fn render_identity_list(config: &MultiBotConfigFile) -> String {
    if config.identities.is_empty() {
        return "no identities configured".to_string();
    }
    let mut output = format!("configured identities ({}):\n", config.identities.len());
    for identity in &config.identities {
        let state = if identity.enabled { "enabled" } else { "disabled" };
        output.push_str(&format!("- {} ({state})\n", identity.identity_ref()));
    }
    output.trim_end().to_string()
}

/// Full filter-block summary for every configured identity.
pub fn render_identity_config_report(config: &MultiBotConfigFile) -> String {
    if config.identities.is_empty() {
        return "no identities configured".to_string();
    }
    let mut output = String::new();
    for identity in &config.identities {
        output.push_str(&render_identity_section(identity));
        output.push('\n');
    }
    output.trim_end().to_string()
}

fn render_identity_section(identity: &MultiBotIdentityConfig) -> String {
    let mut section = format!("## {}\n", identity.identity_ref());
    section.push_str(&format!(
        "- enabled: {}\n",
        if identity.enabled { "yes" } else { "no" }
    ));
    let source = &identity.source_filter;
    if source.enabled {
        section.push_str(&format!(
            "- source filter: {} mode, {} rule(s)\n",
            source.mode.as_str(),
            source.rules.len()
        ));
    } else {
        section.push_str("- source filter: off\n");
    }
    let command = &identity.command_filter;
    if command.enabled {
        let listed = command
            .commands
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<&str>>();
        if listed.is_empty() {
            section.push_str("- command filter: on, empty list (all commands rejected)\n");
        } else {
            section.push_str(&format!("- command filter: on, allows {}\n", listed.join(", ")));
        }
    } else {
        section.push_str("- command filter: off\n");
    }
    let keyword = &identity.keyword_filter;
    if keyword.enabled {
        section.push_str(&format!(
            "- keyword filter: {} mode, {} keyword(s)\n",
            keyword.mode.as_str(),
            keyword.keywords.len()
        ));
    } else {
        section.push_str(&format!(
            "- keyword filter: off ({})\n",
            keyword.disabled_policy.as_str()
        ));
    }
    section
}

/// JSON summary record for dashboards and log ingestion.
pub fn identity_summary_payload(config: &MultiBotConfigFile) -> Value {
    let identities = config
        .identities
        .iter()
        .map(|identity| {
            json!({
                "identity_ref": identity.identity_ref(),
                "enabled": identity.enabled,
                "source_filter_enabled": identity.source_filter.enabled,
                "source_rules": identity.source_filter.rules.len(),
                "command_filter_enabled": identity.command_filter.enabled,
                "command_rules": identity.command_filter.commands.len(),
                "keyword_filter_enabled": identity.keyword_filter.enabled,
                "keyword_rules": identity.keyword_filter.keywords.len(),
                "keyword_disabled_policy": identity.keyword_filter.disabled_policy.as_str(),
            })
        })
        .collect::<Vec<Value>>();
    json!({
        "record_type": "multi_bot_identity_summary_v1",
        "timestamp_unix_ms": current_unix_timestamp_ms(),
        "identity_count": config.identities.len(),
        "identities": identities,
    })
}
