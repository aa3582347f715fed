//! sleuthctl library - CLI definition and command implementations.

pub mod cli;
pub mod commands;
pub mod output;
