//! Validate command

use anyhow::Result;
use sleuth_shared::safety::{Dialect, Verdict};
use sleuthd::ControlPlane;

use super::{Outcome, EXIT_APPROVAL, EXIT_BLOCKED};
use crate::output::{kv, to_json, verdict_label};

pub fn validate(plane: &ControlPlane, command: &str, dialect: Option<Dialect>, json: bool) -> Result<Outcome> {
    let validation = match dialect {
        Some(d) => plane.validator().validate(command, d),
        None => plane.check_command(command),
    };

    let exit_code = match validation.verdict {
        Verdict::Allowed => 0,
        Verdict::Blocked => EXIT_BLOCKED,
        Verdict::RequiresApproval => EXIT_APPROVAL,
    };

    if json {
        return Ok(Outcome::with_code(to_json(&validation)?, exit_code));
    }

    let mut lines = vec![format!("{} {}", verdict_label(validation.verdict), validation.command)];
    lines.push(kv("reason", &validation.reason));
    if let Some(rule) = &validation.rule {
        lines.push(kv("rule", rule));
    }
    if let Some(suggestion) = &validation.suggestion {
        lines.push(kv("instead", suggestion));
    }
    Ok(Outcome::with_code(lines.join("\n"), exit_code))
}
