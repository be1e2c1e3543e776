//! Sluice CLI library.
//!
//! This library provides the core functionality for the sluice command-line
//! interface: configuration loading, the directory-backed sink, and command
//! execution.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod sink;

pub use cli::{Cli, Command};
pub use config::CliConfig;
pub use error::{CliError, Result};
pub use sink::DirectorySink;
