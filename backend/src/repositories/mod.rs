//! Credential store adapters for the identity partitions.
//!
//! `PartitionStore` is the seam between identity resolution and persistence.
//! The hosted REST backend is used in production; the SQLite backend serves
//! local development and tests.

pub mod partition_store;
pub mod rest_store;
pub mod sqlite_store;

use crate::config::StoreConfig;
use crate::database::Database;
use anyhow::Result;
use partition_store::PartitionStore;
use rest_store::RestStore;
use sqlite_store::SqliteStore;
use std::sync::Arc;

/// Builds the store backend selected by configuration.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn PartitionStore>> {
    let store: Arc<dyn PartitionStore> = match config {
        StoreConfig::Rest {
            url,
            api_key,
            timeout_seconds,
        } => Arc::new(RestStore::new(url, api_key, *timeout_seconds)?),
        StoreConfig::Sqlite {
            database_url,
            max_connections,
            acquire_timeout_seconds,
        } => {
            let db = Database::new(database_url, *max_connections, *acquire_timeout_seconds).await?;
            Arc::new(SqliteStore::new(db))
        }
    };
    Ok(store)
}
