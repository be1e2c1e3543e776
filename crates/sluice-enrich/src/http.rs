//! HTTP implementation of the address lookup
//!
//! One blocking GET per address against a detection service that answers
//! `{"payload": {"province_detected": ..., "district_detected": ...,
//! "ward_detected": ...}}`. Communication failures are retried a bounded
//! number of times with exponential backoff; what the caller does with a
//! final failure is its business; the enrichment pass treats it as
//! best-effort.

use crate::EnrichError;
use serde::Deserialize;
use sluice_domain::traits::{AddressEnricher, AddressParts, Region};
use std::time::Duration;
use tracing::debug;

/// Default timeout for lookup requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Blocking HTTP client for the address detection service
pub struct HttpEnricher {
    endpoint: String,
    client: reqwest::blocking::Client,
    max_retries: u32,
}

/// Response envelope from the detection service
#[derive(Deserialize)]
struct LookupResponse {
    payload: Option<LookupPayload>,
}

#[derive(Deserialize)]
struct LookupPayload {
    #[serde(default)]
    province_detected: Option<DetectedRegion>,
    #[serde(default)]
    district_detected: Option<DetectedRegion>,
    #[serde(default)]
    ward_detected: Option<DetectedRegion>,
}

#[derive(Deserialize)]
struct DetectedRegion {
    name: String,
    code: String,
}

impl From<DetectedRegion> for Region {
    fn from(detected: DetectedRegion) -> Self {
        Region {
            name: detected.name,
            code: detected.code,
        }
    }
}

impl HttpEnricher {
    /// Create an enricher against the given detection endpoint
    ///
    /// # Parameters
    ///
    /// - `endpoint`: base URL of the detection service, queried as
    ///   `{endpoint}?s={address}`
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap();

        Self {
            endpoint: endpoint.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn fetch(&self, address: &str) -> Result<Option<AddressParts>, EnrichError> {
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self
                .client
                .get(&self.endpoint)
                .query(&[("s", address)])
                .send()
            {
                Ok(response) if response.status().is_success() => {
                    return match response.json::<LookupResponse>() {
                        Ok(body) => Ok(body.payload.map(|payload| AddressParts {
                            province: payload.province_detected.map(Into::into),
                            district: payload.district_detected.map(Into::into),
                            ward: payload.ward_detected.map(Into::into),
                        })),
                        Err(e) => Err(EnrichError::InvalidResponse(format!(
                            "Failed to parse response: {}",
                            e
                        ))),
                    };
                }
                Ok(response) => {
                    last_error = Some(EnrichError::Communication(format!(
                        "Unexpected response status: {}",
                        response.status()
                    )));
                }
                Err(e) => {
                    last_error =
                        Some(EnrichError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, etc.
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                debug!(attempt = attempts, ?delay, "Retrying address lookup");
                std::thread::sleep(delay);
            }
        }

        Err(last_error
            .unwrap_or_else(|| EnrichError::Communication("Max retries exceeded".to_string())))
    }
}

impl AddressEnricher for HttpEnricher {
    type Error = EnrichError;

    fn lookup(&self, address: &str) -> Result<Option<AddressParts>, Self::Error> {
        self.fetch(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enricher_creation() {
        let enricher = HttpEnricher::new("https://detector.example/location_detect");
        assert_eq!(enricher.endpoint, "https://detector.example/location_detect");
        assert_eq!(enricher.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_enricher_with_max_retries() {
        let enricher = HttpEnricher::new("https://detector.example").with_max_retries(5);
        assert_eq!(enricher.max_retries, 5);
    }

    #[test]
    fn test_response_payload_parses_into_parts() {
        let body = r#"{
            "payload": {
                "province_detected": {"name": "Hà Nội", "code": "01"},
                "district_detected": {"name": "Hai Bà Trưng", "code": "007"},
                "ward_detected": null
            }
        }"#;

        let parsed: LookupResponse = serde_json::from_str(body).unwrap();
        let payload = parsed.payload.unwrap();
        assert_eq!(payload.province_detected.unwrap().code, "01");
        assert_eq!(payload.district_detected.unwrap().name, "Hai Bà Trưng");
        assert!(payload.ward_detected.is_none());
    }

    #[test]
    fn test_missing_payload_means_nothing_detected() {
        let parsed: LookupResponse = serde_json::from_str(r#"{"payload": null}"#).unwrap();
        assert!(parsed.payload.is_none());
    }

    // Integration test (requires a reachable detection service)
    #[test]
    #[ignore] // Only run when the detection service is available
    fn test_lookup_integration() {
        let enricher = HttpEnricher::new("https://detector.example/location_detect");
        let result = enricher.lookup("12 Ba Trieu, Hanoi");
        assert!(result.is_ok() || result.is_err());
    }
}
