//! Handing output units to the sink

use crate::error::EngineError;
use sluice_domain::traits::{Relationship, Sink};
use sluice_domain::OutputUnit;
use tracing::debug;

/// Drives the sink's append-only unit sequence
///
/// Every emission follows create → write → put_attributes →
/// report_receive(source URI) → transfer(success); after transfer the unit
/// is immutable. The emitter owns nothing but the provenance URI.
#[derive(Debug, Clone)]
pub struct Emitter {
    source_uri: String,
}

impl Emitter {
    /// Emitter reporting `source_uri` as every unit's origin
    pub fn new(source_uri: impl Into<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
        }
    }

    /// Emit one unit through the sink
    pub fn emit<K>(&self, sink: &mut K, unit: OutputUnit) -> Result<(), EngineError>
    where
        K: Sink,
    {
        debug!(uuid = unit.uuid(), mime_type = %unit.mime_type, bytes = unit.payload.len(), "Emitting unit");

        let mut handle = sink.create().map_err(sink_err)?;
        sink.write(&mut handle, &unit.payload).map_err(sink_err)?;
        sink.put_attributes(&mut handle, &unit.attributes)
            .map_err(sink_err)?;
        sink.report_receive(&mut handle, &self.source_uri)
            .map_err(sink_err)?;
        sink.transfer(handle, Relationship::Success).map_err(sink_err)
    }
}

fn sink_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Sink(e.to_string())
}
