//! sleuthctl - command-line front end for the Sleuth control plane.

use anyhow::Result;
use clap::Parser;
use sleuthctl::cli::Cli;
use sleuthctl::commands;
use sleuthd::{logging, ControlPlane, SleuthConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init("warn");

    let config = SleuthConfig::load_or_default(cli.config.as_deref())?;
    let plane = ControlPlane::new(config);

    let outcome = commands::run(&cli, &plane)?;
    println!("{}", outcome.text);
    if outcome.exit_code != 0 {
        std::process::exit(outcome.exit_code);
    }
    Ok(())
}
