//! Query specification for one extraction run

use crate::window::TimeWindow;
use bson::{doc, Document};

/// Normalized description of one store query
///
/// A `QuerySpec` is immutable once a run starts. Incremental runs never
/// mutate it either: [`QuerySpec::for_window`] derives a fresh spec per
/// window, so range predicates cannot accumulate across iterations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    /// Selection criteria; `None` queries the whole collection
    pub filter: Option<Document>,

    /// Fields to return from matched records
    pub projection: Option<Document>,

    /// Sort order for matched records
    pub sort: Option<Document>,

    /// Maximum number of records to return
    pub limit: Option<i64>,

    /// Number of records the server returns per fetch
    pub batch_size: Option<u32>,
}

impl QuerySpec {
    /// Derive the spec for one window of an incremental run
    ///
    /// The returned spec carries the base filter plus the range predicate
    /// `{field: {"$gte": window.start, "$lt": window.end}}`. If the base
    /// filter already names `field`, the predicate overwrites that key.
    /// The base spec itself is never touched, so repeated calls for
    /// successive windows always start from the same filter.
    pub fn for_window(&self, field: &str, window: &TimeWindow) -> QuerySpec {
        let mut filter = self.filter.clone().unwrap_or_default();
        filter.insert(
            field,
            doc! {
                "$gte": bson::DateTime::from_chrono(window.start),
                "$lt": bson::DateTime::from_chrono(window.end),
            },
        );
        QuerySpec {
            filter: Some(filter),
            ..self.clone()
        }
    }
}
