//! Remote listing entries and ingested-file records

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ModifiedTime, RemotePath};

/// A single entry from a remote directory listing
///
/// This is a port-level DTO: adapters fill it from whatever the server sent,
/// and the ingestion cycle validates `full_path` when it processes the entry.
/// It lives only for the duration of one listing iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileEntry {
    /// Path of the entry as reported by the server
    pub full_path: String,
    /// Whether this entry is a directory
    pub is_directory: bool,
    /// Last modification time in the server's clock offset
    pub last_modified: DateTime<FixedOffset>,
}

impl RemoteFileEntry {
    /// Creates a regular file entry
    pub fn file(full_path: impl Into<String>, last_modified: DateTime<FixedOffset>) -> Self {
        Self {
            full_path: full_path.into(),
            is_directory: false,
            last_modified,
        }
    }

    /// Creates a directory entry
    pub fn directory(full_path: impl Into<String>, last_modified: DateTime<FixedOffset>) -> Self {
        Self {
            full_path: full_path.into(),
            is_directory: true,
            last_modified,
        }
    }

    /// Modification time normalized for dedup comparison
    #[must_use]
    pub fn normalized_modified(&self) -> ModifiedTime {
        ModifiedTime::normalize(&self.last_modified)
    }

    /// Builds the record this entry would produce once ingested
    ///
    /// # Errors
    /// Returns error if `full_path` is not a valid remote path
    pub fn to_record(&self) -> Result<IngestedFileRecord, DomainError> {
        let file_path = RemotePath::new(self.full_path.clone())?;
        Ok(IngestedFileRecord::new(file_path, self.normalized_modified()))
    }
}

/// Persistent marker that a remote file has been downloaded
///
/// The pair `(file_path, creation_time)` is the dedup key. Records are created
/// once, after a download completes, and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestedFileRecord {
    file_path: RemotePath,
    creation_time: ModifiedTime,
}

impl IngestedFileRecord {
    /// Creates a record from its dedup key
    #[must_use]
    pub fn new(file_path: RemotePath, creation_time: ModifiedTime) -> Self {
        Self {
            file_path,
            creation_time,
        }
    }

    /// Remote path of the ingested file
    #[must_use]
    pub fn file_path(&self) -> &RemotePath {
        &self.file_path
    }

    /// Normalized modification time the file had when it was ingested
    #[must_use]
    pub fn creation_time(&self) -> &ModifiedTime {
        &self.creation_time
    }
}
