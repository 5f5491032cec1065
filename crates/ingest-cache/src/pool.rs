//! Database connection pool management
//!
//! Provides a wrapper around SQLx's SqlitePool with:
//! - Automatic directory creation for database files
//! - WAL journal mode for concurrent reads
//! - In-memory mode for testing
//!
//! Schema creation is not done here; it belongs to
//! [`SqliteRecordStore::ensure_ready`](crate::SqliteRecordStore).

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Manages a pool of SQLite connections for the record store
///
/// The pool is configured with:
/// - WAL journal mode for concurrent read access
/// - 5 max connections for file-based databases
/// - 1 connection for in-memory databases (required for data persistence)
/// - 5-second busy timeout to handle write contention
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Creates a new database pool connected to the specified file
    ///
    /// Creates parent directories and the database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        tracing::info!(
            path = %db_path.display(),
            "Database pool initialized"
        );

        Ok(Self { pool })
    }

    /// Creates an in-memory database pool for testing
    ///
    /// Uses a single connection that is never recycled, since SQLite
    /// in-memory databases live and die with their connection.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        tracing::debug!("In-memory database pool initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes all connections in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
