//! Sluice Domain Layer
//!
//! This crate contains the core domain model for sluice: the vocabulary of a
//! windowed extraction run and the trait interfaces that all other layers
//! depend upon. It carries only fundamental primitives (`bson` for store
//! documents, `chrono` for instants, `uuid` for unit identifiers);
//! infrastructure implementations live in other crates.
//!
//! ## Key Concepts
//!
//! - **QuerySpec**: normalized filter/projection/sort/limit description of one
//!   store query, immutable for a run
//! - **TimeWindow**: a half-open `[start, end)` date range partitioning an
//!   incremental run
//! - **WindowPlan**: the lazy, ordered sequence of windows covering a run
//! - **BatchPolicy**: how records group into output units (per record, whole
//!   window, or fixed-size chunks)
//! - **OutputUnit**: one emitted artifact, payload bytes plus attributes
//!
//! ## Architecture
//!
//! - Pure domain logic only, no I/O
//! - Trait definitions for every external collaborator: the document store,
//!   the output sink, the address enrichment service

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod query;
pub mod traits;
pub mod unit;
pub mod window;

// Re-exports for convenience
pub use batch::{BatchPolicy, WHOLE_WINDOW_CEILING};
pub use query::QuerySpec;
pub use unit::OutputUnit;
pub use window::{TimeWindow, WindowPlan, DATE_FORMAT};
