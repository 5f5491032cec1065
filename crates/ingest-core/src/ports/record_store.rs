//! Record store port (driven/secondary port)
//!
//! Persistent table of ingested-file identities. The ingestion cycle only
//! ever asks "have I seen this key?" and "remember this key"; retention and
//! cleanup are outside this system.

use crate::domain::{IngestError, IngestedFileRecord, ModifiedTime, RemotePath};

/// Port trait for the ingested-file record store
#[async_trait::async_trait]
pub trait IRecordStore: Send + Sync {
    /// Creates the schema if needed
    ///
    /// Safe to call any number of times.
    ///
    /// # Errors
    /// Returns [`IngestError::StoreUnavailable`] if the schema cannot be created
    async fn ensure_ready(&self) -> Result<(), IngestError>;

    /// Checks whether a record with this exact dedup key exists
    ///
    /// # Errors
    /// Returns [`IngestError::StoreUnavailable`] if the store cannot be queried
    async fn exists(
        &self,
        file_path: &RemotePath,
        creation_time: &ModifiedTime,
    ) -> Result<bool, IngestError>;

    /// Persists a new record
    ///
    /// # Errors
    /// Returns [`IngestError::StoreUnavailable`] if the write fails
    async fn insert(&self, record: &IngestedFileRecord) -> Result<(), IngestError>;

    /// Total number of records, for reporting
    ///
    /// # Errors
    /// Returns [`IngestError::StoreUnavailable`] if the store cannot be queried
    async fn count(&self) -> Result<u64, IngestError>;
}
