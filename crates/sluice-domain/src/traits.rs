//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the extraction engine and
//! infrastructure. Implementations live in other crates: the document store
//! in `sluice-mongo`, the sink in the host binary, address enrichment in
//! `sluice-enrich`, and in-memory doubles in `sluice-engine` for tests.

use crate::query::QuerySpec;
use bson::Document;
use std::collections::BTreeMap;

/// A scoped, closable iterator over one query's matched records
///
/// `try_next` collapses the hasNext/next pair of the store driver into the
/// idiomatic fallible-iterator form: `Ok(Some(record))` while records
/// remain, `Ok(None)` at exhaustion. The cursor is exclusively owned by the
/// window draining it and releases its server-side resources on `Drop`, so
/// every exit path, early return included, closes it.
pub trait RecordCursor {
    /// Error type for cursor pulls
    type Error: std::fmt::Display;

    /// Pull the next record, or `None` once the cursor is exhausted
    fn try_next(&mut self) -> Result<Option<Document>, Self::Error>;
}

/// A queryable document store
///
/// Implemented by the infrastructure layer (sluice-mongo).
pub trait DocumentStore {
    /// Error type for store operations
    type Error: std::fmt::Display;
    /// Cursor type returned by `find`
    type Cursor: RecordCursor;

    /// Open a cursor over the records matching `spec`
    fn find(&self, spec: &QuerySpec) -> Result<Self::Cursor, Self::Error>;
}

/// Destination a transferred unit is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// Unit emitted successfully
    Success,
    /// Unit could not be processed
    Failure,
}

/// The transactional output sink
///
/// Units follow an append-only sequence: create → write → put_attributes →
/// report_receive → transfer. A run ends with exactly one `commit`, or with
/// `rollback` (conceptually undoing already-transferred units) plus a
/// `backoff` hint asking the host to delay the next run.
pub trait Sink {
    /// Error type for sink operations
    type Error: std::fmt::Display;
    /// Handle to one unit under construction
    type Handle;

    /// Create a new unit handle
    fn create(&mut self) -> Result<Self::Handle, Self::Error>;

    /// Write payload bytes to a unit
    fn write(&mut self, handle: &mut Self::Handle, payload: &[u8]) -> Result<(), Self::Error>;

    /// Attach attributes to a unit
    fn put_attributes(
        &mut self,
        handle: &mut Self::Handle,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error>;

    /// Record where the unit originated
    fn report_receive(
        &mut self,
        handle: &mut Self::Handle,
        source_uri: &str,
    ) -> Result<(), Self::Error>;

    /// Hand the unit over; after this the unit is immutable
    fn transfer(
        &mut self,
        handle: Self::Handle,
        relationship: Relationship,
    ) -> Result<(), Self::Error>;

    /// Commit every unit transferred during the run
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Undo the run's transferred units
    fn rollback(&mut self);

    /// Ask the host to delay scheduling the next run
    fn backoff(&mut self);
}

/// One administrative region returned by address enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Human-readable region name
    pub name: String,
    /// Administrative region code
    pub code: String,
}

/// Province/district/ward detected for one address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Detected province, if any
    pub province: Option<Region>,
    /// Detected district, if any
    pub district: Option<Region>,
    /// Detected ward, if any
    pub ward: Option<Region>,
}

/// Best-effort address lookup service
///
/// One blocking call per input record. A failed lookup leaves the record's
/// enrichment fields absent; it never aborts the record.
pub trait AddressEnricher {
    /// Error type for lookups
    type Error: std::fmt::Display;

    /// Resolve an address string into its administrative regions
    fn lookup(&self, address: &str) -> Result<Option<AddressParts>, Self::Error>;
}
