//! Remote directory port (driven/secondary port)
//!
//! This module defines the interface for talking to the file-transfer server.
//! A connector ([`IRemoteDirectoryClient`]) opens sessions; each
//! [`IRemoteSession`] is owned by exactly one pass and closed at its end.
//!
//! ## Design Notes
//!
//! - Sessions are handed out as fresh boxed values so a pass can never reuse
//!   a session left over from a failed pass.
//! - Errors use [`IngestError`] so callers can tell connection, listing, and
//!   transfer failures apart and apply the right isolation scope.

use std::path::Path;

use crate::domain::{IngestError, RemoteFileEntry, RemotePath};

/// Port trait for establishing remote sessions
#[async_trait::async_trait]
pub trait IRemoteDirectoryClient: Send + Sync {
    /// Opens and authenticates a new session
    ///
    /// # Errors
    /// Returns [`IngestError::Connection`] if the server is unreachable or
    /// rejects the credentials
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, IngestError>;
}

/// Port trait for operations on an open remote session
#[async_trait::async_trait]
pub trait IRemoteSession: Send + Sync {
    /// Lists the immediate children of `folder`
    ///
    /// The order of the returned entries is whatever the server produced.
    ///
    /// # Errors
    /// Returns [`IngestError::Listing`] if the folder cannot be enumerated
    async fn list_directory(&self, folder: &str) -> Result<Vec<RemoteFileEntry>, IngestError>;

    /// Streams a remote file into `local_destination`, replacing any existing file
    ///
    /// Returns the number of bytes written. Success means the whole file
    /// is on disk under `local_destination`.
    ///
    /// # Errors
    /// Returns [`IngestError::Transfer`] if the download did not complete
    async fn download_to(
        &self,
        remote_path: &RemotePath,
        local_destination: &Path,
    ) -> Result<u64, IngestError>;

    /// Closes the session
    ///
    /// # Errors
    /// Returns [`IngestError::Connection`] if the server did not acknowledge
    /// the disconnect; callers treat this as informational
    async fn disconnect(&self) -> Result<(), IngestError>;
}
