//! Per-identity, per-message classification.
//!
//! The decision engine runs the filter pipeline in strict precedence order
//! and short-circuits: an explicit mention of this or another identity always
//! overrides command/keyword evaluation. The resulting trace records every
//! stage outcome for logging and reporting; it is never persisted.

use serde::Serialize;
use serde_json::{json, Value};

use quorum_core::current_unix_timestamp_ms;

use crate::multi_bot_config::MultiBotIdentityConfig;
use crate::multi_bot_contract::{message_event_key, MultiBotMessageEvent};
use crate::multi_bot_filters::{
    evaluate_command_filter, evaluate_keyword_filter, evaluate_source_filter,
};
use crate::multi_bot_mentions::extract_mentioned_ids;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MultiBotClassification` values.
///
/// `Skip` and `Respond` differ only in whether the identity should become or
/// remain the channel owner; `Yield` means another identity was explicitly
/// addressed and this one must not claim ownership even if it would
/// otherwise qualify.
pub enum MultiBotClassification {
    Respond,
    Skip,
    Yield,
}

impl MultiBotClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Respond => "respond",
            Self::Skip => "skip",
            Self::Yield => "yield",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public struct `MultiBotDecisionTrace` shared across Quorum components.
///
/// Stage fields are `None` when the pipeline short-circuited before reaching
/// that stage.
pub struct MultiBotDecisionTrace {
    pub identity_ref: String,
    pub classification: MultiBotClassification,
    pub reason_code: String,
    pub source_filter_passed: Option<bool>,
    pub mentioned_ids: Vec<String>,
    pub command_filter_passed: Option<bool>,
    pub keyword_filter_passed: Option<bool>,
}

impl MultiBotDecisionTrace {
    fn terminal(
        identity_ref: &str,
        classification: MultiBotClassification,
        reason_code: &str,
    ) -> Self {
        Self {
            identity_ref: identity_ref.to_string(),
            classification,
            reason_code: reason_code.to_string(),
            source_filter_passed: None,
            mentioned_ids: Vec::new(),
            command_filter_passed: None,
            keyword_filter_passed: None,
        }
    }
}

/// Classifies one message for one identity configuration.
pub fn classify_multi_bot_message(
    event: &MultiBotMessageEvent,
    config: &MultiBotIdentityConfig,
) -> MultiBotDecisionTrace {
    let identity_ref = config.identity_ref();

    if !config.enabled {
        return traced(
            event,
            MultiBotDecisionTrace::terminal(
                &identity_ref,
                MultiBotClassification::Skip,
                "skip_identity_disabled",
            ),
        );
    }

    let source_passed = evaluate_source_filter(&event.origin, &config.source_filter);
    if !source_passed {
        let mut trace = MultiBotDecisionTrace::terminal(
            &identity_ref,
            MultiBotClassification::Skip,
            "skip_source_filter_blocked",
        );
        trace.source_filter_passed = Some(false);
        return traced(event, trace);
    }

    let mentioned_ids = extract_mentioned_ids(event, &config.self_id);
    if !mentioned_ids.is_empty() {
        let addressed_self = mentioned_ids
            .iter()
            .any(|id| id.as_str() == config.self_id.trim());
        let (classification, reason_code) = if addressed_self {
            (MultiBotClassification::Respond, "respond_mentioned_self")
        } else {
            (MultiBotClassification::Yield, "yield_mentioned_other")
        };
        let mut trace = MultiBotDecisionTrace::terminal(&identity_ref, classification, reason_code);
        trace.source_filter_passed = Some(true);
        trace.mentioned_ids = mentioned_ids;
        return traced(event, trace);
    }

    let mut trace = if event.is_command() {
        let command_passed = evaluate_command_filter(&event.command_name, &config.command_filter);
        let (classification, reason_code) = if command_passed {
            (MultiBotClassification::Respond, "respond_command_permitted")
        } else {
            (MultiBotClassification::Skip, "skip_command_not_permitted")
        };
        let mut trace = MultiBotDecisionTrace::terminal(&identity_ref, classification, reason_code);
        trace.command_filter_passed = Some(command_passed);
        trace
    } else {
        let keyword_passed = evaluate_keyword_filter(&event.text, &config.keyword_filter);
        let (classification, reason_code) = if keyword_passed {
            (MultiBotClassification::Respond, "respond_keyword_permitted")
        } else {
            (MultiBotClassification::Skip, "skip_keyword_blocked")
        };
        let mut trace = MultiBotDecisionTrace::terminal(&identity_ref, classification, reason_code);
        trace.keyword_filter_passed = Some(keyword_passed);
        trace
    };
    trace.source_filter_passed = Some(true);
    traced(event, trace)
}

/// Trace used when an identity's evaluation failed and was isolated; the
/// identity defaults to the safe `Skip` outcome.
pub fn evaluation_failed_trace(identity_ref: &str) -> MultiBotDecisionTrace {
    MultiBotDecisionTrace::terminal(
        identity_ref,
        MultiBotClassification::Skip,
        "skip_evaluation_failed",
    )
}

fn traced(event: &MultiBotMessageEvent, trace: MultiBotDecisionTrace) -> MultiBotDecisionTrace {
    tracing::debug!(
        identity = %trace.identity_ref,
        event_key = %message_event_key(event),
        classification = trace.classification.as_str(),
        reason_code = %trace.reason_code,
        "classified message"
    );
    trace
}

/// JSONL payload mirroring the trace, for durable decision logs.
pub fn decision_trace_payload(event: &MultiBotMessageEvent, trace: &MultiBotDecisionTrace) -> Value {
    json!({
        "record_type": "multi_bot_decision_trace_v1",
        "timestamp_unix_ms": current_unix_timestamp_ms(),
        "event_key": message_event_key(event),
        "channel_id": event.origin.channel_id.trim(),
        "user_id": event.origin.user_id.trim(),
        "is_direct": event.origin.is_direct,
        "identity_ref": trace.identity_ref,
        "classification": trace.classification.as_str(),
        "reason_code": trace.reason_code,
        "source_filter_passed": trace.source_filter_passed,
        "mentioned_ids": trace.mentioned_ids,
        "command_filter_passed": trace.command_filter_passed,
        "keyword_filter_passed": trace.keyword_filter_passed,
    })
}
