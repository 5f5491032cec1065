//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the traits the ingestion core depends on; their implementations
//! live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteDirectoryClient`] / [`IRemoteSession`] - remote listing and download (SFTP)
//! - [`IRecordStore`] - persistent dedup records (SQLite)

pub mod record_store;
pub mod remote_directory;

pub use record_store::IRecordStore;
pub use remote_directory::{IRemoteDirectoryClient, IRemoteSession};
