//! Sluice Address Enrichment Layer
//!
//! Best-effort address lookup for extracted records. This crate provides
//! implementations of the `AddressEnricher` trait from `sluice-domain` and
//! the payload-level enrichment pass that attaches detected regions to a
//! JSON array of records.
//!
//! # Providers
//!
//! - `MockEnricher`: deterministic mock for testing
//! - `HttpEnricher`: blocking HTTP lookup against a detection service
//!
//! # Examples
//!
//! ```
//! use sluice_enrich::MockEnricher;
//! use sluice_domain::traits::{AddressEnricher, AddressParts, Region};
//!
//! let mut enricher = MockEnricher::new();
//! enricher.add_response("12 Ba Trieu, Hanoi", AddressParts {
//!     province: Some(Region { name: "Hà Nội".to_string(), code: "01".to_string() }),
//!     ..AddressParts::default()
//! });
//! let parts = enricher.lookup("12 Ba Trieu, Hanoi").unwrap().unwrap();
//! assert_eq!(parts.province.unwrap().code, "01");
//! ```

#![warn(missing_docs)]

pub mod http;

use serde_json::Value;
use sluice_domain::traits::{AddressEnricher, AddressParts, Region};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

pub use http::HttpEnricher;

/// Errors that can occur during address lookups
#[derive(Error, Debug)]
pub enum EnrichError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response body the detection service returned could not be read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The payload handed to the enrichment pass was not a JSON array
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Mock enricher for deterministic testing
///
/// Returns pre-configured regions without any network call. Addresses
/// without a configured response resolve to `None`, which is the
/// "nothing detected" outcome.
#[derive(Debug, Clone, Default)]
pub struct MockEnricher {
    responses: Arc<Mutex<HashMap<String, AddressParts>>>,
    failures: Arc<Mutex<std::collections::HashSet<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockEnricher {
    /// Create a mock with no configured responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the regions returned for an address
    pub fn add_response(&mut self, address: impl Into<String>, parts: AddressParts) {
        self.responses.lock().unwrap().insert(address.into(), parts);
    }

    /// Configure a lookup error for an address
    pub fn add_failure(&mut self, address: impl Into<String>) {
        self.failures.lock().unwrap().insert(address.into());
    }

    /// Number of lookups performed
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl AddressEnricher for MockEnricher {
    type Error = EnrichError;

    fn lookup(&self, address: &str) -> Result<Option<AddressParts>, Self::Error> {
        *self.call_count.lock().unwrap() += 1;
        if self.failures.lock().unwrap().contains(address) {
            return Err(EnrichError::Communication("scripted failure".to_string()));
        }
        Ok(self.responses.lock().unwrap().get(address).cloned())
    }
}

/// Attach detected regions to every record of a JSON-array payload
///
/// Each object's `address` field drives one blocking lookup; detected
/// regions land as `province`/`district`/`ward` objects. Enrichment is
/// best-effort by contract: a missing address, an empty detection, or a
/// failed lookup leaves that object untouched and never aborts the array.
pub fn enrich_payload<E>(payload: &str, enricher: &E) -> Result<String, EnrichError>
where
    E: AddressEnricher,
{
    let parsed: Value = serde_json::from_str(payload)
        .map_err(|e| EnrichError::InvalidPayload(format!("payload is not JSON: {}", e)))?;
    let Value::Array(mut items) = parsed else {
        return Err(EnrichError::InvalidPayload(
            "payload must be a JSON array of records".to_string(),
        ));
    };

    for item in &mut items {
        let Value::Object(object) = item else {
            continue;
        };
        let Some(address) = object.get("address").and_then(Value::as_str).map(str::to_string)
        else {
            continue;
        };

        match enricher.lookup(&address) {
            Ok(Some(parts)) => {
                if let Some(region) = &parts.province {
                    object.insert("province".to_string(), region_value(region));
                }
                if let Some(region) = &parts.district {
                    object.insert("district".to_string(), region_value(region));
                }
                if let Some(region) = &parts.ward {
                    object.insert("ward".to_string(), region_value(region));
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(address = %address, error = %e, "Address lookup failed; record left unenriched");
            }
        }
    }

    serde_json::to_string(&Value::Array(items))
        .map_err(|e| EnrichError::InvalidPayload(e.to_string()))
}

fn region_value(region: &Region) -> Value {
    serde_json::json!({"name": region.name, "code": region.code})
}
