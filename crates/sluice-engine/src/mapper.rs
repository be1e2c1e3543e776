//! Field mapping: merging store lookups into an existing payload

use crate::error::EngineError;
use crate::serializer::normalized_value;
use serde_json::Value;
use sluice_domain::traits::{DocumentStore, RecordCursor};
use sluice_domain::QuerySpec;
use tracing::warn;

/// Merges store records into the objects of a JSON-array payload
///
/// For each object in the payload, the mapper reads `from_field`, queries
/// the store for records whose `to_field` equals that value, and merges the
/// matched records' fields into the object. The store id field is excluded
/// when `replace_id` is set, and the mapped key itself is never copied back.
/// A lookup failure leaves that object unmerged and the remaining objects
/// still process.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    spec: QuerySpec,
    from_field: String,
    to_field: String,
    replace_id: bool,
}

impl FieldMapper {
    /// Mapper joining payload `from_field` values against store `to_field`
    pub fn new(spec: QuerySpec, from_field: impl Into<String>, to_field: impl Into<String>) -> Self {
        Self {
            spec,
            from_field: from_field.into(),
            to_field: to_field.into(),
            replace_id: false,
        }
    }

    /// Exclude the store id field from merged records
    pub fn with_replace_id(mut self, replace_id: bool) -> Self {
        self.replace_id = replace_id;
        self
    }

    /// Rewrite a JSON-array payload with merged store fields
    pub fn map_payload<S>(&self, store: &S, payload: &str) -> Result<String, EngineError>
    where
        S: DocumentStore,
    {
        let parsed: Value = serde_json::from_str(payload)
            .map_err(|e| EngineError::InvalidPayload(format!("payload is not JSON: {}", e)))?;
        let Value::Array(mut items) = parsed else {
            return Err(EngineError::InvalidPayload(
                "payload must be a JSON array of objects".to_string(),
            ));
        };

        for item in &mut items {
            let Value::Object(object) = item else {
                warn!("Skipping non-object payload element");
                continue;
            };
            let Some(key) = object
                .get(&self.from_field)
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                warn!(field = %self.from_field, "Skipping object without mapping field");
                continue;
            };

            let mut filter = self.spec.filter.clone().unwrap_or_default();
            filter.insert(self.to_field.clone(), key.clone());
            let lookup = QuerySpec {
                filter: Some(filter),
                ..self.spec.clone()
            };

            let mut cursor = match store.find(&lookup) {
                Ok(cursor) => cursor,
                Err(e) => {
                    warn!(key = %key, error = %e, "Lookup failed; object left unmerged");
                    continue;
                }
            };
            loop {
                match cursor.try_next() {
                    Ok(Some(record)) => {
                        for (field, value) in record.iter() {
                            if self.replace_id && field.eq_ignore_ascii_case("_id") {
                                continue;
                            }
                            if field.eq_ignore_ascii_case(&self.to_field) {
                                continue;
                            }
                            object.insert(field.clone(), normalized_value(value));
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(key = %key, error = %e, "Lookup cursor failed mid-merge");
                        break;
                    }
                }
            }
        }

        serde_json::to_string(&Value::Array(items)).map_err(Into::into)
    }
}
