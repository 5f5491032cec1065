//! sftp-ingest cache - persistent record store
//!
//! SQLite-based storage for the ingested-file records that make re-scans
//! idempotent.
//!
//! ## Architecture
//!
//! This crate implements the `IRecordStore` port from `ingest-core` using
//! SQLite as the storage backend. It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool (file-backed or in-memory)
//! - [`SqliteRecordStore`] - `IRecordStore` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use ingest_cache::{DatabasePool, SqliteRecordStore};
//! use ingest_core::ports::IRecordStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DatabasePool::new(Path::new("/var/lib/sftp-ingest/ingest.db")).await?;
//! let store = SqliteRecordStore::new(pool.pool().clone());
//! store.ensure_ready().await?;
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

use ingest_core::domain::IngestError;

pub use pool::DatabasePool;
pub use repository::SqliteRecordStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be converted back into a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<CacheError> for IngestError {
    fn from(e: CacheError) -> Self {
        IngestError::StoreUnavailable(e.to_string())
    }
}
