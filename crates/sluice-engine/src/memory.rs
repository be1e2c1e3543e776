//! In-memory store and sink doubles
//!
//! Deterministic implementations of the collaborator traits, useful for
//! tests and for embedding the engine without real infrastructure. Failures
//! can be scripted the way the real collaborators fail: a cursor that dies
//! mid-pull, a find that refuses a particular window.

use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use sluice_domain::traits::{DocumentStore, RecordCursor, Relationship, Sink};
use sluice_domain::QuerySpec;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error type shared by the in-memory doubles
#[derive(Error, Debug)]
#[error("{0}")]
pub struct MemoryError(pub String);

/// Cursor over a fixed record list, with an optional scripted failure
pub struct MemoryCursor {
    records: std::vec::IntoIter<Document>,
    pulled: usize,
    fail_after: Option<usize>,
}

impl MemoryCursor {
    /// Cursor over `records`, in order
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records: records.into_iter(),
            pulled: 0,
            fail_after: None,
        }
    }

    /// Script a pull error after `n` successful pulls
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl RecordCursor for MemoryCursor {
    type Error = MemoryError;

    fn try_next(&mut self) -> Result<Option<Document>, Self::Error> {
        if self.fail_after == Some(self.pulled) {
            return Err(MemoryError("cursor failed mid-iteration".to_string()));
        }
        self.pulled += 1;
        Ok(self.records.next())
    }
}

/// In-memory document store
///
/// Serves records matching the spec's filter, honoring equality predicates
/// and `$gte`/`$lt` range predicates on top-level fields, plus sort-free
/// `limit`. That is enough to exercise the engine's window partitioning
/// against real predicates.
#[derive(Default)]
pub struct MemoryStore {
    records: Vec<Document>,
    fail_pull_after: Option<usize>,
    fail_window_containing: Option<DateTime<Utc>>,
    fail_all_finds: bool,
}

impl MemoryStore {
    /// Store serving the given records
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Script every cursor to fail after `n` pulls
    pub fn failing_pull_after(mut self, n: usize) -> Self {
        self.fail_pull_after = Some(n);
        self
    }

    /// Script `find` to fail for the window whose range contains `instant`
    pub fn failing_window_containing(mut self, instant: DateTime<Utc>) -> Self {
        self.fail_window_containing = Some(instant);
        self
    }

    /// Script every `find` to fail
    pub fn failing_all_finds(mut self) -> Self {
        self.fail_all_finds = true;
        self
    }

    fn window_matches_scripted_failure(&self, filter: &Document) -> bool {
        let Some(instant) = self.fail_window_containing else {
            return false;
        };
        let target = Bson::DateTime(bson::DateTime::from_chrono(instant));
        filter.values().any(|condition| {
            condition.as_document().is_some_and(|range| {
                matches!(
                    (range.get("$gte"), range.get("$lt")),
                    (Some(gte), Some(lt)) if compare(gte, &target) != Some(std::cmp::Ordering::Greater)
                        && compare(lt, &target) == Some(std::cmp::Ordering::Greater)
                )
            })
        })
    }
}

impl DocumentStore for MemoryStore {
    type Error = MemoryError;
    type Cursor = MemoryCursor;

    fn find(&self, spec: &QuerySpec) -> Result<Self::Cursor, Self::Error> {
        if self.fail_all_finds {
            return Err(MemoryError("find refused".to_string()));
        }
        if let Some(filter) = &spec.filter {
            if self.window_matches_scripted_failure(filter) {
                return Err(MemoryError("find failed for scripted window".to_string()));
            }
        }

        let mut matched: Vec<Document> = self
            .records
            .iter()
            .filter(|record| {
                spec.filter
                    .as_ref()
                    .map_or(true, |filter| matches(filter, record))
            })
            .cloned()
            .collect();
        if let Some(limit) = spec.limit {
            matched.truncate(limit as usize);
        }

        let mut cursor = MemoryCursor::new(matched);
        cursor.fail_after = self.fail_pull_after;
        Ok(cursor)
    }
}

/// Whether a record satisfies a filter of equality and range predicates
fn matches(filter: &Document, record: &Document) -> bool {
    filter.iter().all(|(field, condition)| {
        let actual = record.get(field);
        match condition.as_document() {
            Some(range) if range.keys().any(|k| k.starts_with('$')) => {
                range.iter().all(|(op, operand)| match op.as_str() {
                    "$gte" => matches!(
                        actual.and_then(|a| compare(a, operand)),
                        Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
                    ),
                    "$lt" => matches!(
                        actual.and_then(|a| compare(a, operand)),
                        Some(std::cmp::Ordering::Less)
                    ),
                    "$exists" => actual.is_some() == operand.as_bool().unwrap_or(true),
                    _ => false,
                })
            }
            _ => actual == Some(condition),
        }
    })
}

/// Ordering between two comparable store values
fn compare(a: &Bson, b: &Bson) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some(i64::from(*x).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&i64::from(*y))),
        (Bson::Double(x), Bson::Double(y)) => x.partial_cmp(y),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// One unit as observed by the in-memory sink
#[derive(Debug, Clone)]
pub struct SinkUnit {
    /// Payload bytes written to the unit
    pub payload: Vec<u8>,
    /// Attributes attached to the unit
    pub attributes: BTreeMap<String, String>,
    /// Provenance URI reported for the unit
    pub source_uri: Option<String>,
    /// Relationship the unit was transferred to
    pub relationship: Relationship,
}

/// Handle to a unit under construction in the in-memory sink
#[derive(Debug, Default)]
pub struct MemoryHandle {
    payload: Vec<u8>,
    attributes: BTreeMap<String, String>,
    source_uri: Option<String>,
}

/// Transactional in-memory sink
///
/// Transferred units stage in memory; `commit` makes them visible as
/// committed, `rollback` discards them. Counters expose the transaction
/// calls for assertions.
#[derive(Default)]
pub struct MemorySink {
    staged: Vec<SinkUnit>,
    committed: Vec<SinkUnit>,
    /// Number of `commit` calls observed
    pub commit_count: usize,
    /// Number of `rollback` calls observed
    pub rollback_count: usize,
    /// Number of `backoff` calls observed
    pub backoff_count: usize,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Units transferred during the current run, committed or not
    pub fn transferred(&self) -> &[SinkUnit] {
        &self.staged
    }

    /// Units made durable by `commit`
    pub fn committed(&self) -> &[SinkUnit] {
        &self.committed
    }
}

impl Sink for MemorySink {
    type Error = MemoryError;
    type Handle = MemoryHandle;

    fn create(&mut self) -> Result<Self::Handle, Self::Error> {
        Ok(MemoryHandle::default())
    }

    fn write(&mut self, handle: &mut Self::Handle, payload: &[u8]) -> Result<(), Self::Error> {
        handle.payload.extend_from_slice(payload);
        Ok(())
    }

    fn put_attributes(
        &mut self,
        handle: &mut Self::Handle,
        attributes: &BTreeMap<String, String>,
    ) -> Result<(), Self::Error> {
        handle.attributes.extend(
            attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(())
    }

    fn report_receive(
        &mut self,
        handle: &mut Self::Handle,
        source_uri: &str,
    ) -> Result<(), Self::Error> {
        handle.source_uri = Some(source_uri.to_string());
        Ok(())
    }

    fn transfer(
        &mut self,
        handle: Self::Handle,
        relationship: Relationship,
    ) -> Result<(), Self::Error> {
        self.staged.push(SinkUnit {
            payload: handle.payload,
            attributes: handle.attributes,
            source_uri: handle.source_uri,
            relationship,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.commit_count += 1;
        self.committed.append(&mut self.staged);
        Ok(())
    }

    fn rollback(&mut self) {
        self.rollback_count += 1;
        self.staged.clear();
    }

    fn backoff(&mut self) {
        self.backoff_count += 1;
    }
}
