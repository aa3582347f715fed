//! Judge command - classify one discovery attempt's output

use anyhow::Result;
use serde::Serialize;
use sleuth_shared::discovery::DiscoveryStrategy;
use sleuth_shared::signatures::{ErrorSignatureCatalog, SignatureMatch};
use sleuthd::ControlPlane;

use super::Outcome;
use crate::output::{kv, to_json};

#[derive(Debug, Serialize)]
struct Judgement {
    try_next: bool,
    confirmed: bool,
    signatures: Vec<SignatureMatch>,
}

pub fn judge(plane: &ControlPlane, output: &str, json: bool) -> Result<Outcome> {
    // the verdict depends only on the output text
    let strategy = DiscoveryStrategy {
        name: "manual".to_string(),
        description: String::new(),
        commands: Vec::new(),
        confidence: 0.0,
    };
    let engine = plane.discovery();
    let judgement = Judgement {
        try_next: engine.should_try_next(output, &strategy),
        confirmed: engine.is_confirmed_hit(output, &strategy),
        signatures: ErrorSignatureCatalog::match_all(output),
    };

    if json {
        return Ok(Outcome::ok(to_json(&judgement)?));
    }

    let verdict = match (judgement.try_next, judgement.confirmed) {
        (true, _) => "try next strategy",
        (false, true) => "found: stop here",
        (false, false) => "found (unconfirmed): no error markers, but no listing either",
    };
    let mut lines = vec![verdict.to_string()];
    for sig in &judgement.signatures {
        lines.push(kv(sig.id, sig.diagnosis));
    }
    Ok(Outcome::ok(lines.join("\n")))
}
