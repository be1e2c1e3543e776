//! Sluice MongoDB Store
//!
//! Implements the `DocumentStore` trait over the MongoDB driver's blocking
//! API. One `MongoStore` addresses one collection; every `find` opens a
//! fresh server-side cursor that is released when the wrapping
//! `MongoCursor` drops.
//!
//! # Examples
//!
//! ```no_run
//! use sluice_mongo::{MongoConfig, MongoStore};
//!
//! # fn main() -> Result<(), sluice_mongo::StoreError> {
//! let config = MongoConfig {
//!     uri: "mongodb://localhost:27017".to_string(),
//!     database: "cdp".to_string(),
//!     collection: "users".to_string(),
//! };
//! let store = MongoStore::connect(&config)?;
//! // Store is now ready to open cursors
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

use bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::sync::{Client, Collection};
use serde::{Deserialize, Serialize};
use sluice_domain::traits::{DocumentStore, RecordCursor};
use sluice_domain::QuerySpec;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur talking to the store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Driver-level error
    #[error("Database error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Connection settings were rejected
    #[error("Invalid store config: {0}")]
    InvalidConfig(String),
}

/// Connection settings for one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string
    pub uri: String,
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

/// MongoDB-backed implementation of `DocumentStore`
///
/// Connecting verifies the deployment with a ping, so an unreachable server
/// surfaces before any run starts rather than inside the first window.
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connect to the configured deployment and address its collection
    pub fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        if config.database.trim().is_empty() || config.collection.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "database and collection must be set".to_string(),
            ));
        }

        let client = Client::with_uri_str(&config.uri)?;
        let database = client.database(&config.database);
        database.run_command(doc! {"ping": 1}, None)?;
        debug!(database = %config.database, collection = %config.collection, "Connected to store");

        Ok(Self {
            collection: database.collection(&config.collection),
        })
    }

    /// Map a query spec onto driver find options
    fn find_options(spec: &QuerySpec) -> FindOptions {
        FindOptions::builder()
            .projection(spec.projection.clone())
            .sort(spec.sort.clone())
            .limit(spec.limit)
            .batch_size(spec.batch_size)
            .build()
    }
}

impl DocumentStore for MongoStore {
    type Error = StoreError;
    type Cursor = MongoCursor;

    fn find(&self, spec: &QuerySpec) -> Result<Self::Cursor, Self::Error> {
        let filter = spec.filter.clone().unwrap_or_default();
        debug!(?filter, "Opening cursor");
        let cursor = self
            .collection
            .find(filter, Self::find_options(spec))?;
        Ok(MongoCursor { inner: cursor })
    }
}

/// Scoped cursor over one query's matched records
///
/// Dropping the cursor releases its server-side resources, so early returns
/// and error paths close it like any other exit.
pub struct MongoCursor {
    inner: mongodb::sync::Cursor<Document>,
}

impl RecordCursor for MongoCursor {
    type Error = StoreError;

    fn try_next(&mut self) -> Result<Option<Document>, Self::Error> {
        match self.inner.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(StoreError::Driver(e)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_options_carry_the_whole_spec() {
        let spec = QuerySpec {
            filter: Some(doc! {"status": "active"}),
            projection: Some(doc! {"_id": 0, "name": 1}),
            sort: Some(doc! {"updated_at": 1}),
            limit: Some(500),
            batch_size: Some(100),
        };

        let options = MongoStore::find_options(&spec);
        assert_eq!(options.projection, spec.projection);
        assert_eq!(options.sort, spec.sort);
        assert_eq!(options.limit, Some(500));
        assert_eq!(options.batch_size, Some(100));
    }

    #[test]
    fn test_find_options_default_to_unset() {
        let options = MongoStore::find_options(&QuerySpec::default());
        assert!(options.projection.is_none());
        assert!(options.sort.is_none());
        assert!(options.limit.is_none());
        assert!(options.batch_size.is_none());
    }

    #[test]
    fn test_connect_rejects_blank_collection() {
        let config = MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "cdp".to_string(),
            collection: " ".to_string(),
        };
        assert!(matches!(
            MongoStore::connect(&config),
            Err(StoreError::InvalidConfig(_))
        ));
    }
}
