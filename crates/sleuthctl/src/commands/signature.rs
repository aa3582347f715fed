//! Signature command

use anyhow::Result;
use sleuth_shared::signatures::ErrorSignatureCatalog;

use super::Outcome;
use crate::output::{header, kv, to_json};

pub fn signature(text: &str, all: bool, json: bool) -> Result<Outcome> {
    let matches = if all {
        ErrorSignatureCatalog::match_all(text)
    } else {
        ErrorSignatureCatalog::match_first(text).into_iter().collect()
    };

    if json {
        return Ok(Outcome::ok(to_json(&matches)?));
    }
    if matches.is_empty() {
        return Ok(Outcome::ok("No known error signature matched"));
    }

    let mut lines = Vec::new();
    for m in &matches {
        lines.push(header(m.id));
        lines.push(kv("matched", &m.excerpt));
        lines.push(kv("diagnosis", m.diagnosis));
        lines.push(kv("next", m.strategy));
        lines.push(kv("hint", m.hint));
    }
    Ok(Outcome::ok(lines.join("\n")))
}
