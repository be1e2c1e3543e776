//! Sluice Extraction Engine
//!
//! Drives windowed extraction runs against a document store: plans date
//! windows, drains one scoped cursor per window, groups records under a
//! batching policy, renders JSON or CSV payloads, and hands units to a
//! transactional sink.
//!
//! # Architecture
//!
//! ```text
//! RunConfig → RunController → WindowPlan
//!                │ per window: QueryExecutor → Batches → PayloadSerializer → Emitter
//!                └ one commit per run (rollback + backoff on fatal failure)
//! ```
//!
//! # Key Features
//!
//! - **Incremental mode**: disjoint half-open date windows, processed in
//!   chronological order with per-window failure recovery
//! - **Batching policies**: one unit per record, one unit per window, or
//!   fixed-size chunks with remainder flush
//! - **Two JSON conventions**: the store's canonical extended JSON, or
//!   normalized plain JSON (ISO-8601 dates, plain string identifiers)
//! - **CSV output**: whole-window batches as header-plus-rows tables
//! - **Field mapping**: merge store lookups into an existing JSON payload
//!
//! # Example Usage
//!
//! ```
//! use sluice_engine::{MemorySink, MemoryStore, RunConfig, RunController};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new(vec![bson::doc! {"name": "alice"}]);
//! let mut sink = MemorySink::new();
//!
//! let config = RunConfig {
//!     source_uri: "memory://example".to_string(),
//!     ..RunConfig::default()
//! };
//! let report = RunController::new(config)?.run(&store, &mut sink)?;
//!
//! assert_eq!(report.units_emitted, 1);
//! assert_eq!(sink.committed().len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod batcher;
mod config;
mod controller;
mod emitter;
mod error;
mod executor;
mod mapper;
mod memory;
mod serializer;
mod types;

pub use batcher::{Batches, RecordBatch};
pub use config::{IncrementalConfig, JsonFlavor, OutputFormat, RunConfig};
pub use controller::RunController;
pub use emitter::Emitter;
pub use error::EngineError;
pub use executor::QueryExecutor;
pub use mapper::FieldMapper;
pub use memory::{MemoryCursor, MemoryError, MemorySink, MemoryStore, SinkUnit};
pub use serializer::{normalized_record, normalized_value, PayloadSerializer};
pub use types::{RunReport, RunState};
