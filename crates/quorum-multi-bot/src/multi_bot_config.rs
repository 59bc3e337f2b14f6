//! Identity configuration file: per-bot filter blocks and lookup helpers.
//!
//! Configuration order is load-bearing: the arbitrator walks identities in
//! the order they appear here, which makes the deference rule deterministic.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MULTI_BOT_CONFIG_SCHEMA_VERSION: u32 = 1;
pub const MULTI_BOT_CONFIG_FILE_NAME: &str = "multi-bot-config.json";

fn multi_bot_config_schema_version() -> u32 {
    MULTI_BOT_CONFIG_SCHEMA_VERSION
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `FilterMode` values.
pub enum FilterMode {
    #[default]
    Whitelist,
    Blacklist,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whitelist => "whitelist",
            Self::Blacklist => "blacklist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates recognized `SourceRuleKind` values.
pub enum SourceRuleKind {
    Guild,
    User,
    Channel,
    Private,
}

impl SourceRuleKind {
    /// Parses a stored rule kind. Unrecognized kinds return `None`; the
    /// source evaluator treats such rules as never matching instead of
    /// failing the whole block.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "guild" => Some(Self::Guild),
            "user" => Some(Self::User),
            "channel" => Some(Self::Channel),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guild => "guild",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `SourceRule` shared across Quorum components.
///
/// `kind` is stored as free text so configuration written by a newer schema
/// still loads; `value` is a JSON string or bool depending on the kind.
pub struct SourceRule {
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `SourceFilterBlock` shared across Quorum components.
pub struct SourceFilterBlock {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub rules: Vec<SourceRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `CommandFilterBlock` shared across Quorum components.
///
/// `mode` is nominal: evaluation is list-membership of the command name in
/// `commands` regardless of the configured mode. Enabled with an empty list
/// rejects every command.
pub struct CommandFilterBlock {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `KeywordDisabledPolicy` values.
///
/// Historical deployments disagreed on what a disabled keyword filter means;
/// the policy is therefore an explicit named value. `RespondAll` passes every
/// non-command message through, `RespondNone` is the stricter legacy reading.
pub enum KeywordDisabledPolicy {
    #[default]
    RespondAll,
    RespondNone,
}

impl KeywordDisabledPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RespondAll => "respond_all",
            Self::RespondNone => "respond_none",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
/// Public struct `KeywordFilterBlock` shared across Quorum components.
pub struct KeywordFilterBlock {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub disabled_policy: KeywordDisabledPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `MultiBotIdentityConfig` shared across Quorum components.
pub struct MultiBotIdentityConfig {
    pub platform: String,
    pub self_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub source_filter: SourceFilterBlock,
    #[serde(default)]
    pub command_filter: CommandFilterBlock,
    #[serde(default)]
    pub keyword_filter: KeywordFilterBlock,
}

impl MultiBotIdentityConfig {
    pub fn identity_ref(&self) -> String {
        identity_ref(&self.platform, &self.self_id)
    }
}

/// Renders the `platform:self_id` identity reference.
pub fn identity_ref(platform: &str, self_id: &str) -> String {
    format!("{}:{}", platform.trim(), self_id.trim())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `MultiBotConfigFile` shared across Quorum components.
pub struct MultiBotConfigFile {
    #[serde(default = "multi_bot_config_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub identities: Vec<MultiBotIdentityConfig>,
}

impl Default for MultiBotConfigFile {
    fn default() -> Self {
        Self {
            schema_version: MULTI_BOT_CONFIG_SCHEMA_VERSION,
            identities: Vec::new(),
        }
    }
}

impl MultiBotConfigFile {
    /// Looks up the configuration for one identity; absence means the engine
    /// does not manage channels on behalf of that identity.
    pub fn config_for(&self, platform: &str, self_id: &str) -> Option<&MultiBotIdentityConfig> {
        self.identities.iter().find(|identity| {
            identity.platform.trim() == platform.trim() && identity.self_id.trim() == self_id.trim()
        })
    }

    /// Identities configured for one platform, in configuration order.
    pub fn identities_for_platform(&self, platform: &str) -> Vec<&MultiBotIdentityConfig> {
        self.identities
            .iter()
            .filter(|identity| identity.platform.trim() == platform.trim())
            .collect()
    }

    /// All configured identity refs, in configuration order.
    pub fn list_identity_refs(&self) -> Vec<String> {
        self.identities
            .iter()
            .map(MultiBotIdentityConfig::identity_ref)
            .collect()
    }
}

pub fn load_multi_bot_config_file(path: &Path) -> Result<MultiBotConfigFile> {
    if !path.exists() {
        return Ok(MultiBotConfigFile::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read multi-bot config {}", path.display()))?;
    parse_multi_bot_config(&raw)
        .with_context(|| format!("invalid multi-bot config {}", path.display()))
}

pub fn parse_multi_bot_config(raw: &str) -> Result<MultiBotConfigFile> {
    let parsed = serde_json::from_str::<MultiBotConfigFile>(raw)
        .context("failed to parse multi-bot config")?;
    validate_multi_bot_config(&parsed)?;
    Ok(parsed)
}

pub fn validate_multi_bot_config(config: &MultiBotConfigFile) -> Result<()> {
    if config.schema_version != MULTI_BOT_CONFIG_SCHEMA_VERSION {
        bail!(
            "unsupported multi-bot config schema_version {} (expected {})",
            config.schema_version,
            MULTI_BOT_CONFIG_SCHEMA_VERSION
        );
    }
    let mut seen_refs = HashSet::new();
    for identity in &config.identities {
        if identity.platform.trim().is_empty() {
            bail!("identity config has empty platform");
        }
        if identity.self_id.trim().is_empty() {
            bail!("identity config has empty self_id");
        }
        let identity_ref = identity.identity_ref();
        if !seen_refs.insert(identity_ref.clone()) {
            bail!("duplicate identity config '{}'", identity_ref);
        }
        for rule in &identity.source_filter.rules {
            if SourceRuleKind::parse(&rule.kind).is_none() {
                // Tolerated: the rule loads but can never match.
                tracing::warn!(
                    identity = %identity_ref,
                    kind = %rule.kind,
                    "source rule has unrecognized kind; it will never match"
                );
            }
        }
    }
    Ok(())
}
