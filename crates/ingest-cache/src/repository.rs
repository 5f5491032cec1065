//! SQLite implementation of IRecordStore
//!
//! ## Type Mapping
//!
//! | Domain Type    | SQL Type | Strategy                                               |
//! |----------------|----------|--------------------------------------------------------|
//! | RemotePath     | TEXT     | String via `.as_str()` / `RemotePath::new()`           |
//! | ModifiedTime   | TEXT     | `to_storage_string()` / `ModifiedTime::parse()`        |
//! | ingested_at    | TEXT     | RFC 3339 wall-clock time of the insert (not part of the key) |
//!
//! `ModifiedTime` renders equal instants as byte-identical strings, so the
//! dedup lookup is a plain text equality on both key columns.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use ingest_core::domain::{IngestError, IngestedFileRecord, ModifiedTime, RemotePath};
use ingest_core::ports::IRecordStore;

use crate::CacheError;

/// Schema applied by [`SqliteRecordStore::ensure_ready`]
const SCHEMA_SQL: &str = include_str!("migrations/0001_ingested_files.sql");

/// SQLite-based implementation of the record store port
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Creates a new store backed by the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recently inserted records, newest first
    ///
    /// # Errors
    /// Returns `CacheError` if the query fails or a stored row is malformed
    pub async fn recent(&self, limit: u32) -> Result<Vec<IngestedFileRecord>, CacheError> {
        let rows = sqlx::query(
            "SELECT file_path, creation_time FROM ingested_files ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

/// Reconstruct a record from a database row
fn record_from_row(row: &SqliteRow) -> Result<IngestedFileRecord, CacheError> {
    let file_path_str: String = row.get("file_path");
    let creation_time_str: String = row.get("creation_time");

    let file_path = RemotePath::new(file_path_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid stored file_path: {}", e))
    })?;
    let creation_time = ModifiedTime::parse(&creation_time_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid stored creation_time: {}", e))
    })?;

    Ok(IngestedFileRecord::new(file_path, creation_time))
}

// ============================================================================
// IRecordStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IRecordStore for SqliteRecordStore {
    #[instrument(skip(self))]
    async fn ensure_ready(&self) -> Result<(), IngestError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                CacheError::MigrationFailed(format!("Failed to create ingested_files: {}", e))
            })?;

        debug!("Record store schema ready");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %file_path, creation_time = %creation_time))]
    async fn exists(
        &self,
        file_path: &RemotePath,
        creation_time: &ModifiedTime,
    ) -> Result<bool, IngestError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ingested_files WHERE file_path = ? AND creation_time = ?)",
        )
        .bind(file_path.as_str())
        .bind(creation_time.to_storage_string())
        .fetch_one(&self.pool)
        .await
        .map_err(CacheError::from)?;

        Ok(found != 0)
    }

    #[instrument(skip(self, record), fields(path = %record.file_path()))]
    async fn insert(&self, record: &IngestedFileRecord) -> Result<(), IngestError> {
        sqlx::query(
            "INSERT INTO ingested_files (file_path, creation_time, ingested_at) VALUES (?, ?, ?)",
        )
        .bind(record.file_path().as_str())
        .bind(record.creation_time().to_storage_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        debug!("Record inserted");
        Ok(())
    }

    async fn count(&self) -> Result<u64, IngestError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingested_files")
            .fetch_one(&self.pool)
            .await
            .map_err(CacheError::from)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
