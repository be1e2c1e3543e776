//! CLI configuration: store connection plus run settings in one file.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use sluice_engine::RunConfig;
use sluice_mongo::MongoConfig;
use std::path::Path;

/// Top-level configuration file
///
/// ```toml
/// [store]
/// uri = "mongodb://localhost:27017"
/// database = "cdp"
/// collection = "users"
///
/// [run]
/// source_uri = "mongodb://localhost:27017/cdp.users"
/// results_per_unit = 99999
///
/// [run.incremental]
/// range_field = "updated_at"
/// range_days = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Store connection settings
    pub store: MongoConfig,
    /// Extraction run settings
    pub run: RunConfig,
}

impl CliConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: CliConfig = toml::from_str(&raw)?;
        config.run.validate()?;
        Ok(config)
    }
}
