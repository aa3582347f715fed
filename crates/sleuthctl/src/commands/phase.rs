//! Phase command - where an investigation stands and what it needs next

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use sleuth_shared::evidence::{DebuggingContext, EvidenceField};
use sleuth_shared::phase::{self, Enforcement, Phase};

use super::Outcome;
use crate::output::{header, kv, to_json};

#[derive(Debug, Serialize)]
struct PhaseReport {
    phase: Phase,
    missing: Vec<EvidenceField>,
    collect_next: Vec<EvidenceField>,
    can_finish: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked_reason: Option<String>,
    gated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enforcement: Option<Enforcement>,
}

/// Parse evidence given as a JSON object. Strings are taken as-is, booleans
/// and numbers by their text, nulls are skipped.
pub fn parse_context(raw: &str) -> Result<DebuggingContext> {
    let value: Value = serde_json::from_str(raw).context("Evidence is not valid JSON")?;
    let Value::Object(map) = value else {
        bail!("Evidence must be a JSON object");
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            other => bail!("Evidence field {key} must be a scalar, got {other}"),
        };
        pairs.push((key, text));
    }
    Ok(DebuggingContext::from_pairs(pairs)?)
}

fn field_list(fields: &[EvidenceField]) -> String {
    if fields.is_empty() {
        return "none".to_string();
    }
    fields.iter().map(EvidenceField::as_str).collect::<Vec<_>>().join(", ")
}

/// One command per line; blank lines and `#` comments are ignored
pub fn parse_history(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn phase(
    context: &str,
    query: &str,
    history: &[String],
    action: Option<&str>,
    json: bool,
) -> Result<Outcome> {
    let mut ctx = parse_context(context)?;

    let enforcement = action.map(|a| phase::observe_and_enforce(&mut ctx, query, history, a));
    let gated = phase::is_gated_query(query);
    let (can_finish, blocked_reason) = phase::can_finish(&ctx);

    let report = PhaseReport {
        phase: phase::current_phase(&ctx),
        missing: phase::missing_evidence(&ctx),
        collect_next: phase::next_evidence(&ctx),
        can_finish,
        blocked_reason,
        gated,
        next_action: gated.then(|| phase::next_required_action(&ctx, query)),
        enforcement,
    };

    // a rejected action is reported with a non-zero exit like a blocked command
    let exit_code = match &report.enforcement {
        Some(e) if !e.allowed => super::EXIT_BLOCKED,
        _ => 0,
    };

    if json {
        return Ok(Outcome::with_code(to_json(&report)?, exit_code));
    }

    let mut lines = vec![header(&format!("Phase: {}", report.phase))];
    lines.push(kv("missing", field_list(&report.missing)));
    lines.push(kv("collect next", field_list(&report.collect_next)));
    lines.push(kv("can finish", report.can_finish));
    if let Some(reason) = &report.blocked_reason {
        lines.push(kv("why not", reason));
    }
    if !gated && !query.is_empty() {
        lines.push(kv("gate", "query is not a troubleshooting query; not enforced"));
    }
    if let Some(next) = &report.next_action {
        lines.push(kv("next", next));
    }
    if let (Some(action), Some(e)) = (action, &report.enforcement) {
        let verdict = if e.allowed { "allowed" } else { "rejected" };
        lines.push(kv("action", format!("{action} {verdict}")));
        if let Some(reason) = &e.reason {
            lines.push(kv("reason", reason));
        }
    }
    Ok(Outcome::with_code(lines.join("\n"), exit_code))
}
