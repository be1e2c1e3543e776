//! Run lifecycle and reporting types

/// Lifecycle of one run
///
/// `Idle → Running → {Committed, RolledBack}`; both terminal states end the
/// run and the controller is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet started
    Idle,
    /// Iterating windows
    Running,
    /// All windows processed, the single commit issued
    Committed,
    /// Fatal failure outside the window loop; transferred units undone
    RolledBack,
}

/// Counters collected over one run
///
/// Partial results are part of the contract: a committed run may have
/// skipped windows or dropped batches, and the report is where that shows.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Windows the plan contained (1 for a non-incremental run)
    pub windows_planned: usize,
    /// Windows fully processed
    pub windows_processed: usize,
    /// Windows skipped after a local failure
    pub windows_failed: usize,
    /// Records pulled from the store
    pub records_read: usize,
    /// Units transferred to the sink
    pub units_emitted: usize,
    /// Chunks dropped after a serialization failure
    pub batches_dropped: usize,
}

impl RunReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line summary for run logs
    pub fn summary(&self) -> String {
        format!(
            "windows {}/{} processed ({} failed), {} records read, {} units emitted, {} batches dropped",
            self.windows_processed,
            self.windows_planned,
            self.windows_failed,
            self.records_read,
            self.units_emitted,
            self.batches_dropped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_every_counter() {
        let report = RunReport {
            windows_planned: 3,
            windows_processed: 2,
            windows_failed: 1,
            records_read: 40,
            units_emitted: 5,
            batches_dropped: 0,
        };
        let summary = report.summary();
        assert!(summary.contains("2/3"));
        assert!(summary.contains("40 records"));
        assert!(summary.contains("5 units"));
    }
}
