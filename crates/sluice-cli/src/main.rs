//! Sluice CLI - windowed extraction from a document store.

use clap::Parser;
use sluice_cli::commands;
use sluice_cli::{Cli, CliConfig, Command};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> sluice_cli::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = CliConfig::load(&cli.config)?;
            commands::execute_run(args, config)
        }
        Command::Plan => {
            let config = CliConfig::load(&cli.config)?;
            commands::execute_plan(config)
        }
        Command::Map(args) => {
            let config = CliConfig::load(&cli.config)?;
            commands::execute_map(args, config)
        }
        Command::Enrich(args) => commands::execute_enrich(args),
    }
}
