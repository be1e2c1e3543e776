//! Grouping a record cursor into batches

use crate::error::EngineError;
use bson::Document;
use sluice_domain::traits::RecordCursor;
use sluice_domain::BatchPolicy;

/// An ordered group of records bound for one output unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    records: Vec<Document>,
}

impl RecordBatch {
    /// Wrap records into a batch
    pub fn new(records: Vec<Document>) -> Self {
        Self { records }
    }

    /// Number of records in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The batched records, in cursor order
    pub fn records(&self) -> &[Document] {
        &self.records
    }

    /// Consume the batch, yielding its records
    pub fn into_records(self) -> Vec<Document> {
        self.records
    }
}

/// Lazy sequence of batches drained from one cursor under a policy
///
/// - `PerRecord` yields a singleton batch per record, as each is read
/// - `WholeWindow` buffers the whole cursor into exactly one batch (which
///   may be empty; the caller decides whether to emit it)
/// - `Chunk(n)` yields full batches of `n` and flushes any non-empty
///   remainder once the cursor is exhausted
///
/// The cursor is owned by the sequence and dropped (closed) with it. A pull
/// error surfaces as an `Err` item, drops whatever was buffered for the
/// current batch, and ends the sequence; batches yielded before the error
/// stand.
pub struct Batches<C: RecordCursor> {
    cursor: C,
    policy: BatchPolicy,
    done: bool,
}

impl<C: RecordCursor> Batches<C> {
    /// Start draining `cursor` under `policy`
    pub fn new(cursor: C, policy: BatchPolicy) -> Self {
        Self {
            cursor,
            policy,
            done: false,
        }
    }

    fn pull(&mut self) -> Result<Option<Document>, EngineError> {
        self.cursor
            .try_next()
            .map_err(|e| EngineError::Store(e.to_string()))
    }
}

impl<C: RecordCursor> Iterator for Batches<C> {
    type Item = Result<RecordBatch, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let ceiling = match self.policy {
            BatchPolicy::PerRecord => 1,
            BatchPolicy::Chunk(n) => n,
            BatchPolicy::WholeWindow => usize::MAX,
        };

        let mut buffer = Vec::new();
        loop {
            match self.pull() {
                Ok(Some(record)) => {
                    buffer.push(record);
                    if buffer.len() == ceiling {
                        return Some(Ok(RecordBatch::new(buffer)));
                    }
                }
                Ok(None) => {
                    self.done = true;
                    if matches!(self.policy, BatchPolicy::WholeWindow) {
                        // Whole-window always yields its single batch, even
                        // when the cursor matched nothing.
                        return Some(Ok(RecordBatch::new(buffer)));
                    }
                    if buffer.is_empty() {
                        return None;
                    }
                    return Some(Ok(RecordBatch::new(buffer)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
