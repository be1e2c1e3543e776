//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sluice CLI - Windowed extraction from a document store.
#[derive(Debug, Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SLUICE_CONFIG", default_value = "sluice.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute an extraction run
    Run(RunArgs),

    /// Print the window plan a run would process
    Plan,

    /// Merge store lookups into a JSON-array payload
    Map(MapArgs),

    /// Attach detected address regions to a JSON-array payload
    Enrich(EnrichArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory the emitted units are committed into
    #[arg(short, long, default_value = "out")]
    pub out_dir: PathBuf,
}

/// Arguments for the map command.
#[derive(Debug, Parser)]
pub struct MapArgs {
    /// JSON-array payload file to rewrite
    pub input: PathBuf,

    /// Payload field the mapping reads
    #[arg(long)]
    pub from_field: String,

    /// Store field the mapping matches against
    #[arg(long)]
    pub to_field: String,

    /// Exclude the store id field from merged records
    #[arg(long)]
    pub replace_id: bool,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the enrich command.
#[derive(Debug, Parser)]
pub struct EnrichArgs {
    /// JSON-array payload file to enrich
    pub input: PathBuf,

    /// Detection service endpoint
    #[arg(long, env = "SLUICE_ENRICH_ENDPOINT")]
    pub endpoint: String,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
