//! Opening scoped cursors, windowed or not

use crate::error::EngineError;
use sluice_domain::traits::DocumentStore;
use sluice_domain::{QuerySpec, TimeWindow};
use tracing::debug;

/// Opens cursors for a run's base spec, scoping each to a window when the
/// run is incremental
///
/// The executor never mutates the base spec: windowed queries run against a
/// fresh spec derived per window, so range predicates cannot leak between
/// windows. The returned cursor is exclusively owned by the caller and
/// closes when dropped, on every exit path.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    spec: QuerySpec,
    range_field: Option<String>,
}

impl QueryExecutor {
    /// Executor for a non-incremental run
    pub fn new(spec: QuerySpec) -> Self {
        Self {
            spec,
            range_field: None,
        }
    }

    /// Executor whose windowed queries range over `field`
    pub fn with_range_field(spec: QuerySpec, field: impl Into<String>) -> Self {
        Self {
            spec,
            range_field: Some(field.into()),
        }
    }

    /// The run's base spec
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Open a cursor, scoped to `window` when present
    pub fn open<S>(&self, store: &S, window: Option<&TimeWindow>) -> Result<S::Cursor, EngineError>
    where
        S: DocumentStore,
    {
        let spec = match (window, &self.range_field) {
            (Some(window), Some(field)) => {
                debug!(%window, "Opening windowed cursor");
                self.spec.for_window(field, window)
            }
            (Some(_), None) => {
                return Err(EngineError::Config(
                    "windowed query requires a range field".to_string(),
                ))
            }
            (None, _) => self.spec.clone(),
        };

        store.find(&spec).map_err(|e| EngineError::Store(e.to_string()))
    }
}
