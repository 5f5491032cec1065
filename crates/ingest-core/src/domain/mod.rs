//! Domain entities and business logic
//!
//! This module contains the core domain types for sftp-ingest:
//! - Newtypes for the dedup key (`RemotePath`, `ModifiedTime`)
//! - Listing entries and ingested-file records
//! - Domain-specific error types and the port error taxonomy

pub mod entry;
pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use entry::{IngestedFileRecord, RemoteFileEntry};
pub use errors::{DomainError, FailureScope, IngestError};
pub use newtypes::{ModifiedTime, RemotePath};
