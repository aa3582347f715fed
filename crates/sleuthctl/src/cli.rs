//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Execution lives in `commands`.

use clap::{Parser, Subcommand, ValueEnum};
use sleuth_shared::safety::Dialect;
use std::path::PathBuf;

/// Sleuth investigation control plane CLI
#[derive(Parser, Debug)]
#[command(name = "sleuthctl")]
#[command(about = "Sleuth - safety gate and evidence tracker for cluster investigations", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides /etc/sleuth/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output JSON only
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Command dialect as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    /// kubectl, oc, helm
    Cluster,
    /// az
    Cloud,
    /// JSON tool call: {"action": ..., "params": {...}}
    Tool,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Cluster => Dialect::ClusterCli,
            DialectArg::Cloud => Dialect::CloudCli,
            DialectArg::Tool => Dialect::ToolCall,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a command is safe to run (exit 2 when blocked)
    Validate {
        /// The full command line, quoted
        command: String,

        /// Dialect; detected from the program name when omitted
        #[arg(long, value_enum)]
        dialect: Option<DialectArg>,
    },

    /// Show the fallback strategies for finding a resource
    Discover {
        /// Resource name as the user wrote it
        name: String,

        /// The user's question, used to enable optional strategies
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Decide whether a discovery attempt's output means "try the next strategy"
    Judge {
        /// File holding the command output (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show the debugging phase for a set of collected evidence
    Phase {
        /// Evidence as a JSON object, e.g. '{"crd_type": "eventhubs"}'
        #[arg(long, default_value = "{}")]
        context: String,

        /// The user's question
        #[arg(long, default_value = "")]
        query: String,

        /// File with one previously executed command per line
        #[arg(long)]
        history: Option<PathBuf>,

        /// Proposed next action to check, e.g. respond
        #[arg(long)]
        action: Option<String>,
    },

    /// Match text against the known error signatures
    Signature {
        /// Error text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Show every matching signature, not only the first
        #[arg(long)]
        all: bool,
    },

    /// Print the effective configuration
    Config,
}
