//! Run orchestration: windows in, committed units out

use crate::batcher::Batches;
use crate::config::{OutputFormat, RunConfig};
use crate::emitter::Emitter;
use crate::error::EngineError;
use crate::executor::QueryExecutor;
use crate::serializer::PayloadSerializer;
use crate::types::{RunReport, RunState};
use chrono::Utc;
use sluice_domain::traits::{DocumentStore, Sink};
use sluice_domain::unit::{attr, mime};
use sluice_domain::{BatchPolicy, OutputUnit, TimeWindow, WindowPlan, DATE_FORMAT};
use tracing::{debug, error, info, warn};

/// Drives one extraction run end to end
///
/// The controller owns the run's transaction boundary: windows are planned
/// and processed strictly in order, any failure inside a single window is
/// recovered locally (the window is skipped, the plan still advances), and
/// the run ends with exactly one commit, or, for a fatal condition outside
/// the window loop, a rollback plus a backoff hint to the host.
///
/// Running a controller consumes it; a new run builds a new controller.
pub struct RunController {
    config: RunConfig,
    executor: QueryExecutor,
    serializer: PayloadSerializer,
    emitter: Emitter,
    policy: BatchPolicy,
    report: RunReport,
    state: RunState,
}

impl RunController {
    /// Build a controller from a validated configuration
    ///
    /// Validation failures surface here, before any cursor or sink
    /// transaction exists.
    pub fn new(config: RunConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let spec = config.query_spec()?;
        let executor = match &config.incremental {
            Some(inc) => QueryExecutor::with_range_field(spec, inc.range_field.clone()),
            None => QueryExecutor::new(spec),
        };
        let serializer = PayloadSerializer::new(config.json_flavor);
        let emitter = Emitter::new(config.source_uri.clone());
        let policy = config.batch_policy();
        Ok(Self {
            config,
            executor,
            serializer,
            emitter,
            policy,
            report: RunReport::new(),
            state: RunState::Idle,
        })
    }

    /// The controller's lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run against a store and a sink
    ///
    /// Returns the run report once the commit lands. An `Err` means the run
    /// rolled back: transferred units were undone and the host was asked to
    /// back off before scheduling another run.
    pub fn run<S, K>(mut self, store: &S, sink: &mut K) -> Result<RunReport, EngineError>
    where
        S: DocumentStore,
        K: Sink,
    {
        self.state = RunState::Running;
        info!(source_uri = %self.config.source_uri, policy = ?self.policy, "Starting extraction run");

        match self.config.incremental.clone() {
            Some(inc) => {
                let (from, to) = self.config.resolve_run_bounds(Utc::now());
                let plan = WindowPlan::new(from, to, inc.range_days);
                self.report.windows_planned = plan.remaining();
                debug!(windows = self.report.windows_planned, "Planned incremental run");

                for window in plan {
                    match self.process_window(store, sink, Some(&window)) {
                        Ok(()) => self.report.windows_processed += 1,
                        Err(e) => {
                            // Local recovery: the window is skipped and the
                            // plan advances to the next one regardless.
                            warn!(%window, error = %e, "Window failed; skipping");
                            self.report.windows_failed += 1;
                        }
                    }
                }
            }
            None => {
                self.report.windows_planned = 1;
                match self.process_window(store, sink, None) {
                    Ok(()) => self.report.windows_processed += 1,
                    Err(e) => {
                        warn!(error = %e, "Query failed; nothing emitted");
                        self.report.windows_failed += 1;
                    }
                }
            }
        }

        match sink.commit() {
            Ok(()) => {
                self.state = RunState::Committed;
                info!("Run committed: {}", self.report.summary());
                Ok(self.report)
            }
            Err(e) => {
                self.state = RunState::RolledBack;
                sink.backoff();
                sink.rollback();
                error!(error = %e, "Commit failed; run rolled back");
                Err(EngineError::Fatal(format!("commit failed: {}", e)))
            }
        }
    }

    /// Process one window (or the single implicit window)
    ///
    /// Any error returned here is a transient, window-scoped failure; units
    /// already transferred for this window stand.
    fn process_window<S, K>(
        &mut self,
        store: &S,
        sink: &mut K,
        window: Option<&TimeWindow>,
    ) -> Result<(), EngineError>
    where
        S: DocumentStore,
        K: Sink,
    {
        let cursor = self.executor.open(store, window)?;
        match self.policy {
            BatchPolicy::PerRecord => self.emit_per_record(sink, cursor),
            BatchPolicy::WholeWindow => self.emit_whole_window(sink, cursor, window),
            BatchPolicy::Chunk(_) => self.emit_chunks(sink, cursor),
        }
    }

    /// One unit per record, emitted as each record is read
    fn emit_per_record<K, C>(&mut self, sink: &mut K, cursor: C) -> Result<(), EngineError>
    where
        K: Sink,
        C: sluice_domain::traits::RecordCursor,
    {
        for batch in Batches::new(cursor, BatchPolicy::PerRecord) {
            let batch = batch?;
            let record = &batch.records()[0];
            self.report.records_read += 1;

            let payload = self.serializer.render_record(record)?;
            let mut unit = OutputUnit::new(payload.into_bytes(), mime::JSON);
            if let Ok(address) = record.get_str(attr::ADDRESS) {
                unit = unit.with_attribute(attr::ADDRESS, address);
            }
            self.emitter.emit(sink, unit)?;
            self.report.units_emitted += 1;
        }
        Ok(())
    }

    /// Buffer the whole cursor into one unit, dropped if it renders empty
    fn emit_whole_window<K, C>(
        &mut self,
        sink: &mut K,
        cursor: C,
        window: Option<&TimeWindow>,
    ) -> Result<(), EngineError>
    where
        K: Sink,
        C: sluice_domain::traits::RecordCursor,
    {
        let mut batches = Batches::new(cursor, BatchPolicy::WholeWindow);
        let batch = match batches.next() {
            Some(batch) => batch?,
            None => return Ok(()),
        };
        self.report.records_read += batch.len();

        let (payload, mime_type) = match self.output_format() {
            OutputFormat::Json => (self.serializer.render_array(batch.records())?, mime::JSON),
            OutputFormat::Csv => (self.serializer.render_csv(batch.records())?, mime::CSV),
        };
        if payload.is_empty() || payload == "[]" {
            debug!("Window matched no records; dropping empty payload");
            return Ok(());
        }

        let mut unit = OutputUnit::new(payload.into_bytes(), mime_type);
        if let Some(window) = window {
            unit = unit.with_attribute(attr::FILENAME, window.start.format(DATE_FORMAT).to_string());
        }
        self.emitter.emit(sink, unit)?;
        self.report.units_emitted += 1;
        Ok(())
    }

    /// Fixed-size chunks; a chunk that fails to render is dropped, its
    /// siblings still emit
    fn emit_chunks<K, C>(&mut self, sink: &mut K, cursor: C) -> Result<(), EngineError>
    where
        K: Sink,
        C: sluice_domain::traits::RecordCursor,
    {
        for batch in Batches::new(cursor, self.policy) {
            let batch = batch?;
            self.report.records_read += batch.len();

            let payload = match self.serializer.render_array(batch.records()) {
                Ok(payload) => payload,
                Err(e) => {
                    error!(error = %e, "Error building batch; dropping chunk");
                    self.report.batches_dropped += 1;
                    continue;
                }
            };
            self.emitter
                .emit(sink, OutputUnit::new(payload.into_bytes(), mime::JSON))?;
            self.report.units_emitted += 1;
        }
        Ok(())
    }

    fn output_format(&self) -> OutputFormat {
        self.config
            .incremental
            .as_ref()
            .map(|inc| inc.output)
            .unwrap_or_default()
    }
}
