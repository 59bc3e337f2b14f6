//! Two-phase assignee arbitration.
//!
//! Phase one classifies every configured identity for the message's platform
//! in configuration order; phase two walks those classifications against a
//! working copy of the channel's current assignee. Splitting the phases keeps
//! the deference rule deterministic and unit-testable without relying on
//! external call ordering. Mutations are issued only when the assignee value
//! would actually change, at most one per identity per message.

use serde::Serialize;

use crate::multi_bot_config::MultiBotConfigFile;
use crate::multi_bot_contract::{message_channel_ref, message_event_key, MultiBotMessageEvent};
use crate::multi_bot_decision::{
    classify_multi_bot_message, evaluation_failed_trace, MultiBotClassification,
    MultiBotDecisionTrace,
};
use crate::multi_bot_owner_store::{OwnerAuditLogger, OwnerMutation, OwnerStateStore};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public struct `OwnerArbitrationOutcome` shared across Quorum components.
pub struct OwnerArbitrationOutcome {
    pub final_assignee: String,
    pub mutations: Vec<OwnerMutation>,
    pub deferred_identity_refs: Vec<String>,
}

/// Phase two: decides the mutation sequence for one message's classification
/// batch. `traces` must be in configuration order; `current_assignee` is the
/// channel owner read once before the walk.
pub fn arbitrate_owner_assignments(
    channel_ref: &str,
    traces: &[MultiBotDecisionTrace],
    current_assignee: &str,
) -> OwnerArbitrationOutcome {
    let mut working_assignee = current_assignee.trim().to_string();
    let mut mutations = Vec::new();
    let mut deferred_identity_refs = Vec::new();

    for trace in traces {
        match trace.classification {
            MultiBotClassification::Respond => {
                if working_assignee == trace.identity_ref {
                    continue;
                }
                // Deference: a different identity already holds the channel
                // and also qualifies for this message; first-claimed wins.
                let holder_also_responds = traces.iter().any(|other| {
                    other.identity_ref == working_assignee
                        && other.classification == MultiBotClassification::Respond
                });
                if !working_assignee.is_empty() && holder_also_responds {
                    deferred_identity_refs.push(trace.identity_ref.clone());
                    continue;
                }
                mutations.push(OwnerMutation {
                    channel_ref: channel_ref.to_string(),
                    identity_ref: trace.identity_ref.clone(),
                    previous_assignee: working_assignee.clone(),
                    new_assignee: trace.identity_ref.clone(),
                    reason_code: trace.reason_code.clone(),
                });
                working_assignee = trace.identity_ref.clone();
            }
            MultiBotClassification::Skip | MultiBotClassification::Yield => {
                if working_assignee != trace.identity_ref {
                    continue;
                }
                mutations.push(OwnerMutation {
                    channel_ref: channel_ref.to_string(),
                    identity_ref: trace.identity_ref.clone(),
                    previous_assignee: working_assignee.clone(),
                    new_assignee: String::new(),
                    reason_code: trace.reason_code.clone(),
                });
                working_assignee.clear();
            }
        }
    }

    OwnerArbitrationOutcome {
        final_assignee: working_assignee,
        mutations,
        deferred_identity_refs,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
/// Public struct `MultiBotArbitrationReport` shared across Quorum components.
pub struct MultiBotArbitrationReport {
    pub event_key: String,
    pub channel_ref: String,
    pub direct_message_exempt: bool,
    pub evaluated_identities: usize,
    pub respond_count: usize,
    pub skip_count: usize,
    pub yield_count: usize,
    pub traces: Vec<MultiBotDecisionTrace>,
    pub mutations: Vec<OwnerMutation>,
    pub deferred_identity_refs: Vec<String>,
    pub final_assignee: String,
    pub store_error: Option<String>,
}

/// Runs the full per-message pass: classify every identity configured for the
/// message's platform, arbitrate, apply mutations, and audit them.
///
/// Failure policy is fail-open: a store error leaves the message unmanaged
/// (no mutations) and is reported on the summary rather than propagated, so
/// one bad channel never blocks the host's message pipeline.
pub fn process_message_event(
    config: &MultiBotConfigFile,
    event: &MultiBotMessageEvent,
    store: &dyn OwnerStateStore,
    audit: Option<&OwnerAuditLogger>,
) -> MultiBotArbitrationReport {
    let mut report = MultiBotArbitrationReport {
        event_key: message_event_key(event),
        ..Default::default()
    };

    // Direct conversations have no shared channel owner to arbitrate.
    if event.origin.is_direct {
        report.direct_message_exempt = true;
        return report;
    }
    report.channel_ref = message_channel_ref(event);

    let identities = config.identities_for_platform(&event.platform);
    report.evaluated_identities = identities.len();
    for identity in &identities {
        // Isolate per-identity failures: a panicking evaluation defaults to a
        // safe skip instead of taking down the host's message pipeline.
        let identity_ref = identity.identity_ref();
        let trace = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            classify_multi_bot_message(event, identity)
        }))
        .unwrap_or_else(|_| {
            tracing::warn!(
                identity = %identity_ref,
                event_key = %report.event_key,
                "classification panicked, defaulting to skip"
            );
            evaluation_failed_trace(&identity_ref)
        });
        match trace.classification {
            MultiBotClassification::Respond => report.respond_count += 1,
            MultiBotClassification::Skip => report.skip_count += 1,
            MultiBotClassification::Yield => report.yield_count += 1,
        }
        report.traces.push(trace);
    }

    let current_assignee = match store.read_assignee(&report.channel_ref) {
        Ok(assignee) => assignee,
        Err(error) => {
            tracing::warn!(
                channel_ref = %report.channel_ref,
                error = %format!("{error:#}"),
                "owner store read failed, message passes through unmanaged"
            );
            report.store_error = Some(format!("{error:#}"));
            return report;
        }
    };

    let outcome =
        arbitrate_owner_assignments(&report.channel_ref, &report.traces, &current_assignee);
    report.final_assignee = outcome.final_assignee.clone();
    report.deferred_identity_refs = outcome.deferred_identity_refs;

    for mutation in outcome.mutations {
        if let Err(error) = store.write_assignee(&mutation.channel_ref, &mutation.new_assignee) {
            tracing::warn!(
                channel_ref = %mutation.channel_ref,
                identity = %mutation.identity_ref,
                error = %format!("{error:#}"),
                "owner store write failed, remaining mutations dropped"
            );
            report.store_error = Some(format!("{error:#}"));
            break;
        }
        tracing::info!(
            channel_ref = %mutation.channel_ref,
            identity = %mutation.identity_ref,
            previous_assignee = %mutation.previous_assignee,
            new_assignee = %mutation.new_assignee,
            reason_code = %mutation.reason_code,
            "channel owner changed"
        );
        if let Some(audit) = audit {
            if let Err(error) = audit.log_mutation(&mutation) {
                tracing::warn!(
                    channel_ref = %mutation.channel_ref,
                    error = %format!("{error:#}"),
                    "owner audit append failed"
                );
            }
        }
        report.mutations.push(mutation);
    }

    report
}
