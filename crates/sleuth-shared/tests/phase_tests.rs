//! Golden tests for the debugging phase gate.

use sleuth_shared::evidence::{DebuggingContext, EvidenceField};
use sleuth_shared::phase::{
    can_finish, current_phase, missing_evidence, next_evidence, observe_and_enforce,
    validate_transition, DebuggingSession, Phase, RetryOutcome,
};

fn full_minus_error() -> DebuggingContext {
    let mut ctx = DebuggingContext::from_pairs([
        ("crd_type", "eventhubs.azure.upbound.io"),
        ("resource_name", "orders-hub"),
        ("namespace", "prod"),
        ("status_state", "Synced=False"),
        ("controller_pod", "upbound-provider-azure-eventhub-7d9f"),
    ])
    .unwrap();
    ctx.mark_logs_checked();
    ctx
}

#[test]
fn test_log_analysis_cannot_finish() {
    let ctx = full_minus_error();
    assert_eq!(current_phase(&ctx), Phase::LogAnalysis);
    let (ok, reason) = can_finish(&ctx);
    assert!(!ok);
    assert!(reason.is_some());
}

#[test]
fn test_error_message_alone_finishes() {
    let ctx = DebuggingContext::from_pairs([("error_message", "AuthorizationFailed")]).unwrap();
    assert_eq!(current_phase(&ctx), Phase::RootCause);
    assert_eq!(can_finish(&ctx), (true, None));
}

#[test]
fn test_phase_serializes_screaming() {
    assert_eq!(serde_json::to_value(Phase::StatusCheck).unwrap(), "STATUS_CHECK");
}

#[test]
fn test_full_walk_through_session() {
    let mut session = DebuggingSession::new("why is my eventhub orders-hub not ready", 3);
    assert!(session.is_gated());
    assert!(!session.enforce::<&str>(&[], "respond").allowed);

    session.record(EvidenceField::CrdType, "eventhubs.azure.upbound.io");
    session.record(EvidenceField::ResourceName, "orders-hub");
    session.record(EvidenceField::Namespace, "prod");
    assert_eq!(session.phase(), Phase::Discover);
    assert!(session.next_action().contains("kubectl describe eventhubs.azure.upbound.io orders-hub -n prod"));

    session.record(EvidenceField::StatusState, "Synced=False");
    session.record(EvidenceField::ControllerPod, "upbound-provider-azure-eventhub-7d9f");
    session.record(EvidenceField::ControllerNamespace, "crossplane-system");
    let e = session.enforce(
        &["kubectl logs upbound-provider-azure-eventhub-7d9f -n crossplane-system --tail=200"],
        "run_command",
    );
    assert!(e.allowed);
    assert_eq!(e.phase, Phase::LogAnalysis);

    session.record(EvidenceField::ErrorMessage, "AuthorizationFailed on Microsoft.EventHub/namespaces/write");
    let e = session.enforce::<&str>(&[], "respond");
    assert!(e.allowed, "{:?}", e.reason);
    assert!(e.missing.is_empty());
}

#[test]
fn test_retry_exhaustion_returns_to_init() {
    let mut session = DebuggingSession::new("why is the provider stuck", 1).with_context(full_minus_error());
    assert_eq!(session.register_retry(), RetryOutcome::Continue(1));
    assert_eq!(session.register_retry(), RetryOutcome::Exhausted);
    assert_eq!(session.phase(), Phase::Init);
    assert!(missing_evidence(session.context()).is_empty());
    assert_eq!(next_evidence(session.context()).len(), 3);
}

#[test]
fn test_enforcement_never_panics_on_empty_context() {
    let mut ctx = DebuggingContext::new();
    let e = observe_and_enforce::<&str>(&mut ctx, "why is crossplane broken", &[], "");
    assert!(e.allowed);
    assert_eq!(e.phase, Phase::Init);
    assert!(e.next_action.is_some());
}

#[test]
fn test_half_found_controller_gates_further_commands() {
    let mut ctx = full_minus_error();
    ctx.reset();
    ctx.record(EvidenceField::ControllerPod, "upbound-provider-azure-eventhub-7d9f");
    assert_eq!(current_phase(&ctx), Phase::ControllerSearch);
    assert_eq!(missing_evidence(&ctx), vec![EvidenceField::ControllerNamespace]);
    let (ok, reason) = validate_transition(&ctx, "run_command");
    assert!(!ok);
    assert!(reason.unwrap().contains("controller_namespace"));
}
