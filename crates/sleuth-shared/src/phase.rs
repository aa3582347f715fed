//! Debugging phase gate.
//!
//! Troubleshooting questions about CRD-style resources must walk a fixed
//! evidence path before an answer is allowed:
//!
//! `INIT -> DISCOVER -> STATUS_CHECK -> CONTROLLER_SEARCH -> LOG_ANALYSIS -> ROOT_CAUSE`
//!
//! The phase is never stored. It is inferred from which evidence the
//! `DebuggingContext` holds, so going backwards is only possible by resetting
//! evidence. Everything here is a pure function of the context except
//! `observe_and_enforce`, which may set the controller-logs flag from the
//! command history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::discovery::sanitize_name;
use crate::evidence::{DebuggingContext, EvidenceField};
use crate::safety::{self, shell};

/// Investigation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Init,
    Discover,
    StatusCheck,
    ControllerSearch,
    LogAnalysis,
    RootCause,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Discover => "DISCOVER",
            Phase::StatusCheck => "STATUS_CHECK",
            Phase::ControllerSearch => "CONTROLLER_SEARCH",
            Phase::LogAnalysis => "LOG_ANALYSIS",
            Phase::RootCause => "ROOT_CAUSE",
        }
    }

    /// Evidence a phase is responsible for collecting
    pub fn required_fields(&self) -> &'static [EvidenceField] {
        match self {
            Phase::Init => &[],
            Phase::Discover => &[
                EvidenceField::CrdType,
                EvidenceField::ResourceName,
                EvidenceField::Namespace,
            ],
            Phase::StatusCheck => &[EvidenceField::StatusState],
            Phase::ControllerSearch => &[
                EvidenceField::ControllerPod,
                EvidenceField::ControllerNamespace,
            ],
            Phase::LogAnalysis => &[EvidenceField::ControllerLogsChecked],
            Phase::RootCause => &[EvidenceField::ErrorMessage],
        }
    }

    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::Discover),
            Phase::Discover => Some(Phase::StatusCheck),
            Phase::StatusCheck => Some(Phase::ControllerSearch),
            Phase::ControllerSearch => Some(Phase::LogAnalysis),
            Phase::LogAnalysis => Some(Phase::RootCause),
            Phase::RootCause => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that end the investigation with an answer
const FINISHING_ACTIONS: &[&str] = &["respond", "done", "finish", "answer", "final_answer"];

const INTENT_KEYWORDS: &[&str] = &[
    "why",
    "debug",
    "troubleshoot",
    "failing",
    "failed",
    "fails",
    "error",
    "not ready",
    "notready",
    "broken",
    "issue",
    "problem",
    "crash",
    "stuck",
    "investigate",
    "root cause",
    "not working",
    "unhealthy",
    "degraded",
    "pending",
    "not synced",
];

const RESOURCE_FAMILY_KEYWORDS: &[&str] = &[
    "crossplane",
    "upbound",
    "crd",
    "custom resource",
    "composition",
    "composite",
    "claim",
    "provider",
    "managed resource",
    "eventhub",
    "servicebus",
    "service bus",
    "resource group",
    "resourcegroup",
    "storage account",
    "keyvault",
    "key vault",
    "azure",
    "aws",
    "gcp",
    "operator",
];

/// Query keyword to resource plural, most specific first
const RESOURCE_TYPE_HINTS: &[(&str, &str)] = &[
    ("consumer group", "consumergroups"),
    ("consumergroup", "consumergroups"),
    ("eventhub namespace", "eventhubnamespaces"),
    ("eventhub", "eventhubs"),
    ("event hub", "eventhubs"),
    ("servicebus", "servicebusnamespaces"),
    ("service bus", "servicebusnamespaces"),
    ("resource group", "resourcegroups"),
    ("resourcegroup", "resourcegroups"),
    ("storage account", "accounts"),
    ("keyvault", "vaults"),
    ("key vault", "vaults"),
    ("postgres", "flexibleservers"),
    ("bucket", "buckets"),
    ("providerconfig", "providerconfigs"),
    ("provider config", "providerconfigs"),
    ("composition", "compositions"),
    ("certificate", "certificates"),
    ("provider", "providers"),
];

/// Infer the phase from evidence, most advanced first
pub fn current_phase(ctx: &DebuggingContext) -> Phase {
    if ctx.has(EvidenceField::ErrorMessage) || ctx.has(EvidenceField::RootCauseIdentified) {
        Phase::RootCause
    } else if ctx.controller_logs_checked {
        Phase::LogAnalysis
    } else if ctx.has(EvidenceField::ControllerPod) {
        Phase::ControllerSearch
    } else if ctx.has(EvidenceField::StatusState) {
        Phase::StatusCheck
    } else if Phase::Discover.required_fields().iter().all(|f| ctx.has(*f)) {
        Phase::Discover
    } else {
        Phase::Init
    }
}

fn unsatisfied(phase: Phase, ctx: &DebuggingContext) -> Vec<EvidenceField> {
    phase
        .required_fields()
        .iter()
        .copied()
        .filter(|f| !ctx.has(*f))
        .collect()
}

/// Required fields of the current phase that are still absent.
///
/// Empty means the current phase is settled. In RootCause this is
/// `[error_message]` when only `root_cause_identified` was recorded.
pub fn missing_evidence(ctx: &DebuggingContext) -> Vec<EvidenceField> {
    unsatisfied(current_phase(ctx), ctx)
}

/// Evidence to collect next: the current phase's gaps, or once those are
/// filled, the next phase's requirements
pub fn next_evidence(ctx: &DebuggingContext) -> Vec<EvidenceField> {
    let phase = current_phase(ctx);
    let own = unsatisfied(phase, ctx);
    if !own.is_empty() {
        return own;
    }
    phase.next().map(|next| unsatisfied(next, ctx)).unwrap_or_default()
}

fn field_list(fields: &[EvidenceField]) -> String {
    fields.iter().map(EvidenceField::as_str).collect::<Vec<_>>().join(", ")
}

/// Whether the investigation may end with an answer
pub fn can_finish(ctx: &DebuggingContext) -> (bool, Option<String>) {
    let phase = current_phase(ctx);
    if phase != Phase::RootCause {
        return (
            false,
            Some(format!(
                "investigation is in {phase}; still missing: {}",
                field_list(&next_evidence(ctx))
            )),
        );
    }
    if ctx.has(EvidenceField::ErrorMessage) || ctx.has(EvidenceField::RootCauseIdentified) {
        (true, None)
    } else {
        (false, Some("no error message or root cause recorded".to_string()))
    }
}

fn is_finishing_action(action: &str) -> bool {
    let action = action.trim().to_lowercase();
    FINISHING_ACTIONS.contains(&action.as_str())
}

/// Whether `action` may run in the current phase.
///
/// No action passes while the current phase is missing any of its own
/// evidence. Finishing actions additionally need ROOT_CAUSE.
pub fn validate_transition(ctx: &DebuggingContext, action: &str) -> (bool, Option<String>) {
    let phase = current_phase(ctx);
    let action = action.trim();
    let missing = missing_evidence(ctx);
    if !missing.is_empty() {
        return (
            false,
            Some(format!(
                "cannot `{action}` during {phase}; record {} first",
                field_list(&missing)
            )),
        );
    }
    if is_finishing_action(action) && phase != Phase::RootCause {
        return (
            false,
            Some(format!(
                "cannot `{action}` during {phase}; collect {} first",
                field_list(&next_evidence(ctx))
            )),
        );
    }
    (true, None)
}

/// Lowercase alphanumeric words of `text`
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word match of a one or more word keyword. The last keyword word
/// also matches its plural.
fn contains_keyword(words: &[String], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split_whitespace().collect();
    let Some((last, init)) = parts.split_last() else {
        return false;
    };
    words.windows(parts.len()).any(|window| {
        let (tail, head) = match window.split_last() {
            Some(split) => split,
            None => return false,
        };
        head.iter().zip(init).all(|(w, k)| w == k)
            && (tail == last
                || tail.strip_suffix('s').is_some_and(|t| t == *last)
                || tail.strip_suffix("es").is_some_and(|t| t == *last))
    })
}

/// Troubleshooting question about a CRD-like resource family
pub fn is_gated_query(query: &str) -> bool {
    let words = words(query);
    INTENT_KEYWORDS.iter().any(|k| contains_keyword(&words, k))
        && RESOURCE_FAMILY_KEYWORDS.iter().any(|k| contains_keyword(&words, k))
}

/// Resource plural suggested by query keywords
pub fn guess_resource_type(query: &str) -> Option<&'static str> {
    let words = words(query);
    RESOURCE_TYPE_HINTS
        .iter()
        .find(|(keyword, _)| contains_keyword(&words, keyword))
        .map(|(_, plural)| *plural)
}

/// Name fragment of the controller pod that reconciles `crd_type`
pub fn guess_controller(crd_type: &str, query: &str) -> String {
    let crd = crd_type.to_lowercase();
    let segments: Vec<&str> = crd.split('.').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 3 {
        if crd.ends_with("upbound.io") || crd.ends_with("crossplane.io") {
            // the segment before the vendor domain names the provider family
            let family = segments[segments.len() - 3];
            if matches!(family, "apiextensions" | "pkg") {
                return "crossplane".to_string();
            }
            return format!("provider-{}", sanitize_name(family));
        }
        return sanitize_name(segments[1]);
    }
    let q = format!("{crd} {}", query.to_lowercase());
    for cloud in ["azure", "aws", "gcp"] {
        if q.contains(cloud) {
            return format!("provider-{cloud}");
        }
    }
    if q.contains("crossplane") {
        return "crossplane".to_string();
    }
    "controller".to_string()
}

fn name_or<'a>(ctx: &'a DebuggingContext, field: EvidenceField, placeholder: &'a str) -> String {
    ctx.get(field)
        .map(sanitize_name)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| placeholder.to_string())
}

/// Canonical next step for the current phase
pub fn next_required_action(ctx: &DebuggingContext, query: &str) -> String {
    match current_phase(ctx) {
        Phase::Init => match guess_resource_type(query) {
            Some(plural) => format!(
                "DISCOVER: locate the resource with `kubectl get {plural} -A` and record crd_type, resource_name and namespace"
            ),
            None => "DISCOVER: find the resource type with `kubectl api-resources | grep -i <type>` then `kubectl get <type> -A`; record crd_type, resource_name and namespace".to_string(),
        },
        Phase::Discover => {
            let kind = name_or(ctx, EvidenceField::CrdType, "<type>");
            let name = name_or(ctx, EvidenceField::ResourceName, "<name>");
            let ns = name_or(ctx, EvidenceField::Namespace, "<namespace>");
            format!(
                "STATUS_CHECK: run `kubectl describe {kind} {name} -n {ns}` and record status_state from the Ready/Synced conditions"
            )
        }
        Phase::StatusCheck => {
            let controller = guess_controller(ctx.crd_type.as_deref().unwrap_or_default(), query);
            format!(
                "CONTROLLER_SEARCH: find the controller with `kubectl get pods -A | grep -i {controller}` and record controller_pod and controller_namespace"
            )
        }
        Phase::ControllerSearch => {
            let pod = name_or(ctx, EvidenceField::ControllerPod, "<pod>");
            if !ctx.has(EvidenceField::ControllerNamespace) {
                return format!(
                    "CONTROLLER_SEARCH: record controller_namespace with `kubectl get pods -A | grep -i {pod}`"
                );
            }
            let ns = name_or(ctx, EvidenceField::ControllerNamespace, "<namespace>");
            let filter = ctx
                .get(EvidenceField::ResourceName)
                .map(sanitize_name)
                .filter(|s| !s.is_empty())
                .map(|n| format!(" | grep -i {n}"))
                .unwrap_or_default();
            format!("LOG_ANALYSIS: read the controller logs with `kubectl logs {pod} -n {ns} --tail=200{filter}`")
        }
        Phase::LogAnalysis => {
            "ROOT_CAUSE: extract the error from the controller logs or resource conditions and record error_message".to_string()
        }
        Phase::RootCause if !ctx.has(EvidenceField::ErrorMessage) => {
            "ROOT_CAUSE: record error_message with the error text that supports the identified root cause".to_string()
        }
        Phase::RootCause => "FINISH: evidence is complete; respond with the root cause".to_string(),
    }
}

/// A `kubectl logs` / `oc logs` stage somewhere in the command
fn is_log_inspection(command: &str) -> bool {
    let Ok(parsed) = shell::parse(command) else {
        return false;
    };
    parsed.stages.iter().any(|stage| {
        matches!(stage.program().as_deref(), Some("kubectl") | Some("oc"))
            && safety::cluster_subcommand(stage).as_deref() == Some("logs")
    })
}

/// Result of one enforcement check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enforcement {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub phase: Phase,
    pub missing: Vec<EvidenceField>,
    /// False when the query is not a gated troubleshooting query
    pub gated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
}

/// Check `action` against the gate, completing evidence visible in `history`.
///
/// Non-gated queries always pass and the context is left untouched. For gated
/// queries a log inspection in `history` sets `controller_logs_checked`
/// before the transition is judged.
pub fn observe_and_enforce<S: AsRef<str>>(
    ctx: &mut DebuggingContext,
    query: &str,
    history: &[S],
    action: &str,
) -> Enforcement {
    if !is_gated_query(query) {
        return Enforcement {
            allowed: true,
            reason: None,
            phase: current_phase(ctx),
            missing: Vec::new(),
            gated: false,
            next_action: None,
        };
    }

    if history.iter().any(|cmd| is_log_inspection(cmd.as_ref())) {
        ctx.mark_logs_checked();
    }

    let (allowed, reason) = validate_transition(ctx, action);
    Enforcement {
        allowed,
        reason,
        phase: current_phase(ctx),
        missing: missing_evidence(ctx),
        gated: true,
        next_action: Some(next_required_action(ctx, query)),
    }
}

/// Outcome of spending one retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "attempt", rename_all = "snake_case")]
pub enum RetryOutcome {
    /// Retry number `n` (1-based) may proceed
    Continue(u32),
    /// Budget spent; evidence was cleared
    Exhausted,
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// One investigation: the query, its evidence and a retry budget
#[derive(Debug, Clone, Serialize)]
pub struct DebuggingSession {
    pub id: Uuid,
    pub query: String,
    pub started_at: DateTime<Utc>,
    context: DebuggingContext,
    retries: u32,
    max_retries: u32,
}

impl DebuggingSession {
    pub fn new(query: impl Into<String>, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            started_at: Utc::now(),
            context: DebuggingContext::default(),
            retries: 0,
            max_retries,
        }
    }

    pub fn with_context(mut self, context: DebuggingContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &DebuggingContext {
        &self.context
    }

    pub fn record(&mut self, field: EvidenceField, value: &str) -> bool {
        self.context.record(field, value)
    }

    pub fn phase(&self) -> Phase {
        current_phase(&self.context)
    }

    pub fn is_gated(&self) -> bool {
        is_gated_query(&self.query)
    }

    pub fn next_action(&self) -> String {
        next_required_action(&self.context, &self.query)
    }

    pub fn enforce<S: AsRef<str>>(&mut self, history: &[S], action: &str) -> Enforcement {
        observe_and_enforce(&mut self.context, &self.query, history, action)
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Spend one retry. On exhaustion the context is reset and the counter
    /// starts over.
    pub fn register_retry(&mut self) -> RetryOutcome {
        if self.retries >= self.max_retries {
            self.context.reset();
            self.retries = 0;
            return RetryOutcome::Exhausted;
        }
        self.retries += 1;
        RetryOutcome::Continue(self.retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> DebuggingContext {
        DebuggingContext::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_phase_inference_order() {
        assert_eq!(current_phase(&DebuggingContext::new()), Phase::Init);
        assert_eq!(current_phase(&ctx(&[("crd_type", "eventhubs"), ("resource_name", "hub")])), Phase::Init);
        assert_eq!(
            current_phase(&ctx(&[("crd_type", "eventhubs"), ("resource_name", "hub"), ("namespace", "prod")])),
            Phase::Discover
        );
        assert_eq!(current_phase(&ctx(&[("status_state", "Synced=False")])), Phase::StatusCheck);
        assert_eq!(current_phase(&ctx(&[("controller_pod", "provider-azure-abc")])), Phase::ControllerSearch);
        assert_eq!(current_phase(&ctx(&[("root_cause_identified", "rbac")])), Phase::RootCause);
    }

    #[test]
    fn test_missing_evidence_is_current_phase_only() {
        assert!(missing_evidence(&DebuggingContext::new()).is_empty());
        let discovered = ctx(&[("crd_type", "eventhubs"), ("resource_name", "hub"), ("namespace", "prod")]);
        assert!(missing_evidence(&discovered).is_empty());
        let half = ctx(&[("controller_pod", "provider-azure-abc")]);
        assert_eq!(missing_evidence(&half), vec![EvidenceField::ControllerNamespace]);
        assert!(missing_evidence(&ctx(&[("error_message", "AuthorizationFailed")])).is_empty());
        assert_eq!(
            missing_evidence(&ctx(&[("root_cause_identified", "missing role")])),
            vec![EvidenceField::ErrorMessage]
        );
    }

    #[test]
    fn test_next_evidence_looks_ahead() {
        assert_eq!(
            next_evidence(&DebuggingContext::new()),
            vec![EvidenceField::CrdType, EvidenceField::ResourceName, EvidenceField::Namespace]
        );
        let discovered = ctx(&[("crd_type", "eventhubs"), ("resource_name", "hub"), ("namespace", "prod")]);
        assert_eq!(next_evidence(&discovered), vec![EvidenceField::StatusState]);
        let half = ctx(&[("controller_pod", "provider-azure-abc")]);
        assert_eq!(next_evidence(&half), vec![EvidenceField::ControllerNamespace]);
        assert!(next_evidence(&ctx(&[("error_message", "AuthorizationFailed")])).is_empty());
    }

    #[test]
    fn test_finish_requires_root_cause() {
        let (ok, reason) = can_finish(&ctx(&[("status_state", "Ready=False")]));
        assert!(!ok);
        assert!(reason.unwrap().contains("STATUS_CHECK"));

        let (ok, reason) = can_finish(&ctx(&[("root_cause_identified", "missing role")]));
        assert!(ok);
        assert!(reason.is_none());
    }

    #[test]
    fn test_transition_rules() {
        let early = ctx(&[("status_state", "Ready=False")]);
        assert_eq!(validate_transition(&early, "run_command"), (true, None));
        let (ok, reason) = validate_transition(&early, "Respond");
        assert!(!ok);
        assert!(reason.unwrap().contains("controller_pod"));

        let done = ctx(&[("error_message", "AuthorizationFailed")]);
        assert_eq!(validate_transition(&done, "done"), (true, None));
    }

    #[test]
    fn test_incomplete_phase_blocks_every_action() {
        let half = ctx(&[("controller_pod", "provider-azure-abc")]);
        let (ok, reason) = validate_transition(&half, "run_command");
        assert!(!ok);
        assert!(reason.unwrap().contains("controller_namespace"));

        let unsupported = ctx(&[("root_cause_identified", "missing role")]);
        let (ok, reason) = validate_transition(&unsupported, "respond");
        assert!(!ok);
        assert!(reason.unwrap().contains("error_message"));
        assert!(next_required_action(&unsupported, "").contains("error_message"));
    }

    #[test]
    fn test_gate_needs_intent_and_family() {
        assert!(is_gated_query("Why is my EventHub not ready?"));
        assert!(is_gated_query("crossplane provider stuck"));
        assert!(!is_gated_query("list my eventhubs"));
        assert!(!is_gated_query("why is the sky blue"));
    }

    #[test]
    fn test_gate_matches_whole_words() {
        assert!(!is_gated_query("why do the laws differ"));
        assert!(!is_gated_query("debug the tissue sample"));
        assert!(!is_gated_query("why does reclaim take so long"));
        assert!(!is_gated_query("investigate the grocery shopping list"));
        assert!(is_gated_query("why are my eventhubs failing"));
        assert!(is_gated_query("Crossplane: root cause of the stuck Claims?"));
        assert_eq!(guess_resource_type("why are my eventhubs failing"), Some("eventhubs"));
        assert_eq!(guess_resource_type("my key vault is broken"), Some("vaults"));
        assert_eq!(guess_resource_type("problem with the bucketlist app"), None);
    }

    #[test]
    fn test_non_gated_query_is_inert() {
        let mut context = DebuggingContext::new();
        let e = observe_and_enforce(&mut context, "show pods", &["kubectl logs web-1 --tail=50"], "respond");
        assert!(e.allowed);
        assert!(!e.gated);
        assert!(!context.controller_logs_checked);
    }

    #[test]
    fn test_history_sets_logs_flag() {
        let mut context = ctx(&[("controller_pod", "provider-azure-abc"), ("controller_namespace", "crossplane-system")]);
        let history = ["kubectl get pods -A", "kubectl -n crossplane-system logs provider-azure-abc --tail=200"];
        let e = observe_and_enforce(&mut context, "why is my eventhub failing", &history, "respond");
        assert!(context.controller_logs_checked);
        assert_eq!(e.phase, Phase::LogAnalysis);
        assert!(!e.allowed);
        assert!(e.missing.is_empty());
        assert!(e.reason.unwrap().contains("error_message"));
    }

    #[test]
    fn test_logs_namespace_is_not_a_log_inspection() {
        let mut context = ctx(&[("status_state", "Synced=False")]);
        let history = ["kubectl get pods -n logs", "oc get pods --namespace logs | grep logs"];
        let e = observe_and_enforce(&mut context, "why is my eventhub failing", &history, "run_command");
        assert!(!context.controller_logs_checked);
        assert_eq!(e.phase, Phase::StatusCheck);
        assert!(e.allowed);
    }

    #[test]
    fn test_next_action_commands() {
        let init = next_required_action(&DebuggingContext::new(), "why is my eventhub not ready");
        assert!(init.contains("kubectl get eventhubs -A"));

        let status = ctx(&[("crd_type", "eventhubs.azure.upbound.io"), ("status_state", "Synced=False")]);
        assert!(next_required_action(&status, "").contains("grep -i provider-azure"));

        let pod = ctx(&[
            ("controller_pod", "provider-azure-abc"),
            ("controller_namespace", "crossplane-system"),
            ("resource_name", "hub"),
        ]);
        let action = next_required_action(&pod, "");
        assert!(action.contains("--tail=200"));
        assert!(!action.contains(" -f"));
    }

    #[test]
    fn test_guess_controller() {
        assert_eq!(guess_controller("compositions.apiextensions.crossplane.io", ""), "crossplane");
        assert_eq!(guess_controller("buckets.s3.aws.upbound.io", ""), "provider-aws");
        assert_eq!(guess_controller("eventhubs", "azure eventhub broken"), "provider-azure");
        assert_eq!(guess_controller("widgets", ""), "controller");
    }

    #[test]
    fn test_retry_budget_resets_context() {
        let mut session = DebuggingSession::new("why is my eventhub failing", 2)
            .with_context(ctx(&[("status_state", "Ready=False")]));
        assert_eq!(session.register_retry(), RetryOutcome::Continue(1));
        assert_eq!(session.register_retry(), RetryOutcome::Continue(2));
        assert_eq!(session.register_retry(), RetryOutcome::Exhausted);
        assert!(session.context().is_empty());
        assert_eq!(session.phase(), Phase::Init);
        assert_eq!(session.retries(), 0);
    }
}
