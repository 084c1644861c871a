//! Module for local database connection setup.
//!
//! The SQLite backend is used for local development and tests. This module
//! initializes its connection pool and applies the embedded migrations that
//! create the three identity partitions.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub mod field_map;
pub mod models;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the SQLite database and runs migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        acquire_timeout_seconds: u64,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid DATABASE_URL '{}'", database_url))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect_with(options)
            .await
            .context("failed to open SQLite database")?;

        let database = Database { pool };
        database.migrate().await?;
        Ok(database)
    }

    /// In-memory database; a single connection keeps every query on the same data.
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:", 1, 3).await
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
