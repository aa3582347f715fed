//! Command modules for sleuthctl.
//!
//! Each command renders its output into an `Outcome`; `main` prints it and
//! exits with the outcome's code.

pub mod config;
pub mod discover;
pub mod judge;
pub mod phase;
pub mod signature;
pub mod validate;

use anyhow::{Context, Result};
use sleuthd::ControlPlane;
use std::io::Read;

use crate::cli::{Cli, Commands};

/// Exit code when `validate` blocks a command
pub const EXIT_BLOCKED: i32 = 2;
/// Exit code when `validate` needs approval
pub const EXIT_APPROVAL: i32 = 3;

/// Rendered command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub exit_code: i32,
}

impl Outcome {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: 0,
        }
    }

    pub fn with_code(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            text: text.into(),
            exit_code,
        }
    }
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Dispatch a parsed command line
pub fn run(cli: &Cli, plane: &ControlPlane) -> Result<Outcome> {
    match &cli.command {
        Commands::Validate { command, dialect } => {
            validate::validate(plane, command, dialect.map(Into::into), cli.json)
        }
        Commands::Discover { name, context } => discover::discover(plane, name, context, cli.json),
        Commands::Judge { file } => {
            let output = read_input(file.as_deref())?;
            judge::judge(plane, &output, cli.json)
        }
        Commands::Phase {
            context,
            query,
            history,
            action,
        } => {
            let history = match history {
                Some(path) => phase::parse_history(&read_input(Some(path.as_path()))?),
                None => Vec::new(),
            };
            phase::phase(context, query, &history, action.as_deref(), cli.json)
        }
        Commands::Signature { text, all } => signature::signature(&text.join(" "), *all, cli.json),
        Commands::Config => config::config(plane, cli.json),
    }
}
