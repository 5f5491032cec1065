//! Domain error types
//!
//! [`DomainError`] covers validation of domain values. [`IngestError`] is the
//! taxonomy used at the port boundaries; each variant maps to the scope of
//! work it aborts (see [`FailureScope`]).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while constructing or validating domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Remote path has no usable final segment
    #[error("No file name in remote path: {0}")]
    MissingFileName(String),

    /// Stored timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// How much work a failure aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// The whole pass is skipped and retried on the next interval
    Pass,
    /// One remote folder is skipped for this pass
    Folder,
    /// One entry is skipped for this pass
    Entry,
}

/// Errors surfaced by the remote client and record store capabilities
#[derive(Debug, Error)]
pub enum IngestError {
    /// The remote session could not be established or authenticated
    #[error("Connection error: {0}")]
    Connection(String),

    /// A remote folder could not be enumerated
    #[error("Listing error for {folder}: {message}")]
    Listing {
        /// Folder that failed to list
        folder: String,
        /// Underlying cause
        message: String,
    },

    /// A download failed before completion
    #[error("Transfer error for {path}: {message}")]
    Transfer {
        /// Remote path of the file being downloaded
        path: String,
        /// Underlying cause
        message: String,
    },

    /// The record store rejected or could not serve a request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The local destination could not be prepared
    #[error("Local I/O error at {}: {message}", path.display())]
    LocalIo {
        /// Local path involved
        path: PathBuf,
        /// Underlying cause
        message: String,
    },

    /// A listed entry cannot be ingested as-is
    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] DomainError),
}

impl IngestError {
    /// Scope of work this error aborts
    pub fn scope(&self) -> FailureScope {
        match self {
            IngestError::Connection(_) | IngestError::LocalIo { .. } => FailureScope::Pass,
            IngestError::Listing { .. } => FailureScope::Folder,
            IngestError::Transfer { .. }
            | IngestError::StoreUnavailable(_)
            | IngestError::InvalidEntry(_) => FailureScope::Entry,
        }
    }

    /// Convenience constructor for transfer failures
    pub fn transfer(path: impl Into<String>, message: impl ToString) -> Self {
        IngestError::Transfer {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for listing failures
    pub fn listing(folder: impl Into<String>, message: impl ToString) -> Self {
        IngestError::Listing {
            folder: folder.into(),
            message: message.to_string(),
        }
    }
}
