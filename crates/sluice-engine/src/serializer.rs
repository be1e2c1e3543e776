//! Payload rendering: records to JSON and batches to JSON arrays or CSV

use crate::config::JsonFlavor;
use crate::error::EngineError;
use bson::{Bson, Document};
use serde_json::Value;
use sluice_domain::DATE_FORMAT;

/// Renders record batches into payload strings
///
/// The flavor is fixed at construction and threaded explicitly; nothing
/// downstream ever re-inspects a format string.
#[derive(Debug, Clone, Copy)]
pub struct PayloadSerializer {
    flavor: JsonFlavor,
}

impl PayloadSerializer {
    /// Create a serializer for the given JSON flavor
    pub fn new(flavor: JsonFlavor) -> Self {
        Self { flavor }
    }

    /// Render one record as a JSON object
    pub fn render_record(&self, record: &Document) -> Result<String, EngineError> {
        let value = match self.flavor {
            JsonFlavor::StoreNative => Bson::Document(record.clone()).into_canonical_extjson(),
            JsonFlavor::Normalized => normalized_record(record),
        };
        serde_json::to_string(&value).map_err(Into::into)
    }

    /// Render a batch as a single JSON array of records
    ///
    /// An empty batch renders as `[]`; the caller decides whether an empty
    /// array is worth emitting.
    pub fn render_array(&self, records: &[Document]) -> Result<String, EngineError> {
        let mut parts = Vec::with_capacity(records.len());
        for record in records {
            parts.push(self.render_record(record)?);
        }
        Ok(format!("[{}]", parts.join(", ")))
    }

    /// Render a batch as CSV
    ///
    /// Each record is first rendered as its normalized JSON object, then the
    /// whole array converts to delimiter-separated rows. The header comes
    /// from the first record's keys, in document order; records missing a
    /// header key contribute an empty cell, and keys outside the header are
    /// dropped. An empty batch renders as an empty string.
    pub fn render_csv(&self, records: &[Document]) -> Result<String, EngineError> {
        let first = match records.first() {
            Some(first) => first,
            None => return Ok(String::new()),
        };
        let header: Vec<&str> = first.keys().map(String::as_str).collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&header)
            .map_err(|e| EngineError::Csv(e.to_string()))?;

        for record in records {
            let object = match normalized_record(record) {
                Value::Object(object) => object,
                other => {
                    return Err(EngineError::Csv(format!(
                        "record did not normalize to a JSON object: {}",
                        other
                    )))
                }
            };
            let row: Vec<String> = header
                .iter()
                .map(|key| object.get(*key).map(csv_cell).unwrap_or_default())
                .collect();
            writer
                .write_record(&row)
                .map_err(|e| EngineError::Csv(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| EngineError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| EngineError::Csv(e.to_string()))
    }
}

/// Render one cell of a CSV row
///
/// Strings go in bare (the CSV writer handles quoting); everything else is
/// its JSON text, so nested objects survive as parseable cells.
fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a record into its normalized JSON object
pub fn normalized_record(record: &Document) -> Value {
    Value::Object(
        record
            .iter()
            .map(|(key, value)| (key.clone(), normalized_value(value)))
            .collect(),
    )
}

/// Convert one store value into plain JSON
///
/// Dates become ISO-8601 UTC strings (never epoch integers), object ids
/// become plain hex strings, numerics stay untagged. Types without a plain
/// rendering fall back to relaxed extended JSON.
pub fn normalized_value(value: &Bson) -> Value {
    match value {
        Bson::Document(doc) => normalized_record(doc),
        Bson::Array(items) => Value::Array(items.iter().map(normalized_value).collect()),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Null => Value::Null,
        Bson::Int32(i) => Value::from(*i),
        Bson::Int64(i) => Value::from(*i),
        Bson::Double(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::DateTime(dt) => Value::String(dt.to_chrono().format(DATE_FORMAT).to_string()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => other.clone().into_relaxed_extjson(),
    }
}
