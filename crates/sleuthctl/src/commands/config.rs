//! Config command

use anyhow::Result;
use sleuthd::ControlPlane;

use super::Outcome;
use crate::output::to_json;

pub fn config(plane: &ControlPlane, json: bool) -> Result<Outcome> {
    let config = plane.config();
    if json {
        return Ok(Outcome::ok(to_json(config)?));
    }
    Ok(Outcome::ok(config.to_toml()?))
}
