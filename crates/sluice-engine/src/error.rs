//! Error types for the extraction engine

use thiserror::Error;

/// Errors that can occur while configuring or driving a run
///
/// Per-window failures never surface through this type: the controller
/// recovers them locally and records them on the run report. What does
/// surface is either a configuration rejected before the run starts, or a
/// fatal condition outside the window loop that rolled the run back.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Run configuration failed validation; the run never began
    #[error("Malformed configuration: {0}")]
    Config(String),

    /// Document store error
    #[error("Store error: {0}")]
    Store(String),

    /// Output sink error
    #[error("Sink error: {0}")]
    Sink(String),

    /// A payload failed to render
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// A batch failed JSON-array-to-CSV conversion
    #[error("CSV conversion error: {0}")]
    Csv(String),

    /// An input payload was not the expected JSON shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Unrecoverable condition outside the window loop; the run rolled back
    #[error("Fatal run failure: {0}")]
    Fatal(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialize(e.to_string())
    }
}
