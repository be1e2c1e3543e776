//! Output units: the artifacts handed to the sink

use std::collections::BTreeMap;
use uuid::Uuid;

/// Well-known MIME types for unit payloads
pub mod mime {
    /// JSON payloads (single records and arrays)
    pub const JSON: &str = "application/json";
    /// CSV payloads produced by incremental whole-window runs
    pub const CSV: &str = "text/csv";
}

/// Well-known attribute keys carried on units
pub mod attr {
    /// Unique identifier minted for every unit
    pub const UUID: &str = "uuid";
    /// MIME type of the payload
    pub const MIME_TYPE: &str = "mime.type";
    /// Window-derived filename for whole-window units
    pub const FILENAME: &str = "filename";
    /// Source record's address, carried on per-record units
    pub const ADDRESS: &str = "address";
}

/// One discrete emitted artifact: payload bytes plus attributes
///
/// A unit is created once per emitted batch (or per record, depending on the
/// batching policy) and consumed exactly once by the sink. Every unit mints
/// a `uuid` attribute at construction; the sink sequence that consumes it is
/// append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    /// Serialized payload
    pub payload: Vec<u8>,
    /// MIME type of the payload
    pub mime_type: String,
    /// Attributes handed to the sink alongside the payload
    pub attributes: BTreeMap<String, String>,
}

impl OutputUnit {
    /// Create a unit, minting its `uuid` attribute
    pub fn new(payload: impl Into<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        let mut attributes = BTreeMap::new();
        attributes.insert(attr::UUID.to_string(), Uuid::now_v7().to_string());
        attributes.insert(attr::MIME_TYPE.to_string(), mime_type.clone());
        Self {
            payload: payload.into(),
            mime_type,
            attributes,
        }
    }

    /// Attach an attribute, replacing any previous value for the key
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The unit's minted identifier
    pub fn uuid(&self) -> &str {
        self.attributes
            .get(attr::UUID)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_mints_uuid_and_mime_type() {
        let unit = OutputUnit::new(b"[]".to_vec(), mime::JSON);
        assert!(!unit.uuid().is_empty());
        assert_eq!(unit.attributes.get(attr::MIME_TYPE).unwrap(), mime::JSON);
    }

    #[test]
    fn test_units_get_distinct_uuids() {
        let a = OutputUnit::new(b"a".to_vec(), mime::JSON);
        let b = OutputUnit::new(b"b".to_vec(), mime::JSON);
        assert_ne!(a.uuid(), b.uuid());
    }

    #[test]
    fn test_with_attribute_overwrites() {
        let unit = OutputUnit::new(b"".to_vec(), mime::CSV)
            .with_attribute("filename", "first")
            .with_attribute("filename", "second");
        assert_eq!(unit.attributes.get("filename").unwrap(), "second");
    }
}
