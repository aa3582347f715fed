//! Discover command

use anyhow::Result;
use owo_colors::OwoColorize;
use sleuthd::ControlPlane;

use super::Outcome;
use crate::output::{header, to_json};

pub fn discover(plane: &ControlPlane, name: &str, context: &str, json: bool) -> Result<Outcome> {
    let strategies = plane.discovery().generate(name, context);
    if json {
        return Ok(Outcome::ok(to_json(&strategies)?));
    }
    if strategies.is_empty() {
        return Ok(Outcome::ok(format!("No usable resource name in {name:?}")));
    }

    let mut lines = vec![header(&format!("Discovery plan for {name}"))];
    for (i, strategy) in strategies.iter().enumerate() {
        lines.push(format!(
            "{:>2}. {} ({:.2}) {}",
            i + 1,
            strategy.name.cyan(),
            strategy.confidence,
            strategy.description
        ));
        for cmd in &strategy.commands {
            lines.push(format!("      $ {cmd}"));
        }
    }
    Ok(Outcome::ok(lines.join("\n")))
}
