//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction engine error
    #[error("Engine error: {0}")]
    Engine(#[from] sluice_engine::EngineError),

    /// Document store error
    #[error("Store error: {0}")]
    Store(#[from] sluice_mongo::StoreError),

    /// Address enrichment error
    #[error("Enrichment error: {0}")]
    Enrich(#[from] sluice_enrich::EnrichError),

    /// Directory sink error
    #[error("Sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
