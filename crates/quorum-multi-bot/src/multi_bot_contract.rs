//! Multi-bot message-event contract types and validation.
//!
//! Defines the normalized message/session view consumed by the decision
//! engine. Adapters translate host-framework events into this shape so the
//! engine stays free of any transport-specific registration mechanism.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const MULTI_BOT_CONTRACT_SCHEMA_VERSION: u32 = 1;

fn multi_bot_contract_schema_version() -> u32 {
    MULTI_BOT_CONTRACT_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `MultiBotMessageOrigin` shared across Quorum components.
pub struct MultiBotMessageOrigin {
    #[serde(default)]
    pub guild_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub is_direct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `MultiBotMentionSignals` shared across Quorum components.
///
/// Message transports represent addressing in several partially-overlapping
/// ways; all four signal sources are carried so the mention extractor can
/// reconcile them into one canonical list. Empty `reply_target_id` means no
/// reply reference.
pub struct MultiBotMentionSignals {
    #[serde(default)]
    pub structural_self_flag: bool,
    #[serde(default)]
    pub inline_mention_ids: Vec<String>,
    #[serde(default)]
    pub reply_target_id: String,
    #[serde(default)]
    pub raw_markup_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `MultiBotMessageEvent` shared across Quorum components.
pub struct MultiBotMessageEvent {
    #[serde(default = "multi_bot_contract_schema_version")]
    pub schema_version: u32,
    pub platform: String,
    pub message_id: String,
    #[serde(default)]
    pub text: String,
    /// Parsed command invocation name; empty when the message is not a command.
    #[serde(default)]
    pub command_name: String,
    #[serde(default)]
    pub origin: MultiBotMessageOrigin,
    #[serde(default)]
    pub mention_signals: MultiBotMentionSignals,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl MultiBotMessageEvent {
    pub fn is_command(&self) -> bool {
        !self.command_name.trim().is_empty()
    }
}

pub fn parse_multi_bot_message_event(raw: &str) -> Result<MultiBotMessageEvent> {
    let event = serde_json::from_str::<MultiBotMessageEvent>(raw)
        .context("failed to parse multi-bot message event")?;
    validate_multi_bot_message_event(&event)?;
    Ok(event)
}

pub fn validate_multi_bot_message_event(event: &MultiBotMessageEvent) -> Result<()> {
    if event.schema_version != MULTI_BOT_CONTRACT_SCHEMA_VERSION {
        bail!(
            "message event has unsupported schema_version {} (expected {})",
            event.schema_version,
            MULTI_BOT_CONTRACT_SCHEMA_VERSION
        );
    }
    if event.platform.trim().is_empty() {
        bail!("message event has empty platform");
    }
    if event.message_id.trim().is_empty() {
        bail!("message event has empty message_id");
    }
    if event.origin.user_id.trim().is_empty() {
        bail!("message event has empty origin user_id");
    }
    if !event.origin.is_direct && event.origin.channel_id.trim().is_empty() {
        bail!("non-direct message event has empty origin channel_id");
    }
    if event
        .mention_signals
        .inline_mention_ids
        .iter()
        .any(|id| id.trim().is_empty())
    {
        bail!("message event includes empty inline mention id");
    }
    Ok(())
}

/// Stable dedupe/audit key for a message event.
pub fn message_event_key(event: &MultiBotMessageEvent) -> String {
    format!("{}:{}", event.platform.trim(), event.message_id.trim())
}

/// Channel reference (`platform/channel_id`) used by the owner store.
pub fn message_channel_ref(event: &MultiBotMessageEvent) -> String {
    format!(
        "{}/{}",
        event.platform.trim(),
        event.origin.channel_id.trim()
    )
}
