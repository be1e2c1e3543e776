//! Run configuration

use crate::error::EngineError;
use bson::{Bson, Document};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sluice_domain::{BatchPolicy, QuerySpec, DATE_FORMAT};

/// JSON convention used to render records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonFlavor {
    /// The store's own writer: canonical extended JSON, preserving
    /// store-specific type tags for numerics, dates, and identifiers
    StoreNative,
    /// Plain JSON: ISO-8601 dates (never epoch integers), identifiers as
    /// plain strings, untagged numerics
    Normalized,
}

impl Default for JsonFlavor {
    fn default() -> Self {
        JsonFlavor::StoreNative
    }
}

/// Payload format for incremental whole-window units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One JSON array per window
    Json,
    /// One CSV table per window
    Csv,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}

/// Incremental-mode settings: windowed extraction over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalConfig {
    /// Record field carrying the timestamp the windows range over
    pub range_field: String,

    /// Window length in days
    #[serde(default = "default_range_days")]
    pub range_days: u32,

    /// Run start; unset or unparsable falls back to now minus one day
    #[serde(default)]
    pub from_date: Option<String>,

    /// Run finish; unset or unparsable falls back to now
    #[serde(default)]
    pub to_date: Option<String>,

    /// Payload format for whole-window units
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_range_days() -> u32 {
    1
}

/// Configuration for one extraction run
///
/// Constructed from named fields (or TOML), validated once before the run
/// begins, never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Provenance URI reported for every emitted unit
    pub source_uri: String,

    /// Selection criteria as an extended-JSON document
    #[serde(default)]
    pub filter: Option<String>,

    /// Projection as a JSON document
    #[serde(default)]
    pub projection: Option<String>,

    /// Sort order as a JSON document
    #[serde(default)]
    pub sort: Option<String>,

    /// Maximum number of records to return
    #[serde(default)]
    pub limit: Option<i64>,

    /// Number of records the server returns per fetch
    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Records per emitted unit; unset means one unit per record, values at
    /// or above the whole-window ceiling mean one unit per window
    #[serde(default)]
    pub results_per_unit: Option<u32>,

    /// JSON convention for rendered records
    #[serde(default)]
    pub json_flavor: JsonFlavor,

    /// Windowed extraction; unset runs a single unwindowed query
    #[serde(default)]
    pub incremental: Option<IncrementalConfig>,
}

impl RunConfig {
    /// Validate the configuration
    ///
    /// Every check here surfaces before any run starts; a config that fails
    /// validation never opens a cursor or a sink transaction.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(filter) = &self.filter {
            parse_document("filter", filter)?;
        }
        if let Some(projection) = &self.projection {
            parse_document("projection", projection)?;
        }
        if let Some(sort) = &self.sort {
            parse_document("sort", sort)?;
        }
        if matches!(self.limit, Some(n) if n <= 0) {
            return Err(EngineError::Config("limit must be positive".to_string()));
        }
        if matches!(self.batch_size, Some(0)) {
            return Err(EngineError::Config("batch_size must be positive".to_string()));
        }
        if matches!(self.results_per_unit, Some(0)) {
            return Err(EngineError::Config(
                "results_per_unit must be positive".to_string(),
            ));
        }
        if let Some(inc) = &self.incremental {
            if inc.range_field.trim().is_empty() {
                return Err(EngineError::Config(
                    "incremental range_field must not be empty".to_string(),
                ));
            }
            if inc.range_days == 0 {
                return Err(EngineError::Config(
                    "incremental range_days must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Build the run's base query spec from the configured documents
    pub fn query_spec(&self) -> Result<QuerySpec, EngineError> {
        Ok(QuerySpec {
            filter: self
                .filter
                .as_deref()
                .map(|s| parse_document("filter", s))
                .transpose()?,
            projection: self
                .projection
                .as_deref()
                .map(|s| parse_document("projection", s))
                .transpose()?,
            sort: self
                .sort
                .as_deref()
                .map(|s| parse_document("sort", s))
                .transpose()?,
            limit: self.limit,
            batch_size: self.batch_size,
        })
    }

    /// The batching policy the configured ceiling maps to
    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy::from_ceiling(self.results_per_unit)
    }

    /// Resolve the incremental run bounds against the given instant
    ///
    /// An absent or unparsable `from_date` defaults to `now` minus one day;
    /// an absent or unparsable `to_date` defaults to `now`.
    pub fn resolve_run_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let inc = self.incremental.as_ref();
        let from = inc
            .and_then(|i| i.from_date.as_deref())
            .and_then(parse_date)
            .unwrap_or_else(|| now - Duration::days(1));
        let to = inc
            .and_then(|i| i.to_date.as_deref())
            .and_then(parse_date)
            .unwrap_or(now);
        (from, to)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

/// Parse a run date in the shared wire format
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a configured JSON string into a store document
///
/// Accepts extended JSON, so configured filters can carry `$date`/`$oid`
/// operands.
fn parse_document(role: &str, raw: &str) -> Result<Document, EngineError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| EngineError::Config(format!("{} is not valid JSON: {}", role, e)))?;
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(EngineError::Config(format!("{} must be a JSON object", role))),
        Err(e) => Err(EngineError::Config(format!("{} is not a valid document: {}", role, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_filter_is_rejected() {
        let config = RunConfig {
            filter: Some("{not json".to_string()),
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_non_object_filter_is_rejected() {
        let config = RunConfig {
            filter: Some("[1, 2, 3]".to_string()),
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_non_positive_limit_is_rejected() {
        let config = RunConfig {
            limit: Some(0),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_range_field_is_rejected() {
        let config = RunConfig {
            incremental: Some(IncrementalConfig {
                range_field: "  ".to_string(),
                range_days: 1,
                from_date: None,
                to_date: None,
                output: OutputFormat::Json,
            }),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_query_spec_parses_extended_json_filter() {
        let config = RunConfig {
            filter: Some(r#"{"status": "active", "_id": {"$oid": "507f1f77bcf86cd799439011"}}"#.to_string()),
            limit: Some(50),
            ..RunConfig::default()
        };

        let spec = config.query_spec().unwrap();
        let filter = spec.filter.unwrap();
        assert_eq!(filter.get_str("status").unwrap(), "active");
        assert!(filter.get_object_id("_id").is_ok());
        assert_eq!(spec.limit, Some(50));
    }

    #[test]
    fn test_run_bounds_default_to_yesterday_and_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let config = RunConfig {
            incremental: Some(IncrementalConfig {
                range_field: "updated_at".to_string(),
                range_days: 1,
                from_date: Some("garbage".to_string()),
                to_date: None,
                output: OutputFormat::Json,
            }),
            ..RunConfig::default()
        };

        let (from, to) = config.resolve_run_bounds(now);
        assert_eq!(from, now - Duration::days(1));
        assert_eq!(to, now);
    }

    #[test]
    fn test_run_bounds_parse_wire_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let config = RunConfig {
            incremental: Some(IncrementalConfig {
                range_field: "updated_at".to_string(),
                range_days: 1,
                from_date: Some("2024-01-01T00:00:00.000Z".to_string()),
                to_date: Some("2024-01-03T00:00:00.000Z".to_string()),
                output: OutputFormat::Json,
            }),
            ..RunConfig::default()
        };

        let (from, to) = config.resolve_run_bounds(now);
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RunConfig {
            source_uri: "mongodb://localhost/cdp.users".to_string(),
            filter: Some(r#"{"status": "active"}"#.to_string()),
            results_per_unit: Some(99999),
            json_flavor: JsonFlavor::Normalized,
            incremental: Some(IncrementalConfig {
                range_field: "updated_at".to_string(),
                range_days: 7,
                from_date: Some("2024-01-01T00:00:00.000Z".to_string()),
                to_date: None,
                output: OutputFormat::Csv,
            }),
            ..RunConfig::default()
        };

        let toml_str = config.to_toml().unwrap();
        let parsed = RunConfig::from_toml(&toml_str).unwrap();

        assert_eq!(parsed.source_uri, config.source_uri);
        assert_eq!(parsed.json_flavor, config.json_flavor);
        let inc = parsed.incremental.unwrap();
        assert_eq!(inc.range_days, 7);
        assert_eq!(inc.output, OutputFormat::Csv);
    }
}
