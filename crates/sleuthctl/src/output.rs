//! Output formatting - plain ASCII with color accents.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use sleuth_shared::safety::Verdict;

pub const SEPARATOR: &str = "------------------------------------------------------------";

pub fn header(title: &str) -> String {
    format!("{}\n{}", title.bold(), SEPARATOR)
}

pub fn kv(key: &str, value: impl std::fmt::Display) -> String {
    format!("  {} {}", format!("{key}:").dimmed(), value)
}

pub fn verdict_label(verdict: Verdict) -> String {
    match verdict {
        Verdict::Allowed => "[ALLOWED]".bright_green().to_string(),
        Verdict::Blocked => "[BLOCKED]".bright_red().to_string(),
        Verdict::RequiresApproval => "[APPROVAL]".yellow().to_string(),
    }
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to render JSON")
}
