//! SftpSession - IRemoteSession implementation
//!
//! ## Design Notes
//!
//! - libssh2 sessions are not safe for concurrent use, so the session and its
//!   SFTP channel sit behind one `std::sync::Mutex` and each operation runs
//!   to completion on a blocking thread while holding it.
//! - Listing does not recurse; subdirectories are reported with
//!   `is_directory = true` and left to the caller.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use tracing::{debug, instrument, warn};

use ingest_core::domain::{IngestError, RemoteFileEntry, RemotePath};
use ingest_core::ports::IRemoteSession;

use crate::staging;

/// Authenticated SSH session with its SFTP channel
pub(crate) struct Connection {
    pub(crate) session: Session,
    pub(crate) sftp: Sftp,
}

/// One open SFTP session, used by a single pass
///
/// Dropping it without `disconnect` frees the libssh2 session and closes
/// the TCP stream without sending SSH_MSG_DISCONNECT.
pub struct SftpSession {
    connection: Arc<Mutex<Connection>>,
    endpoint: String,
}

impl SftpSession {
    pub(crate) fn new(connection: Connection, endpoint: String) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            endpoint,
        }
    }

    /// Runs `op` against the connection on a blocking thread
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);

        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| anyhow!("SFTP session lock poisoned"))?;
            op(&guard)
        })
        .await
        .context("SFTP worker task failed")?
    }
}

#[async_trait::async_trait]
impl IRemoteSession for SftpSession {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn list_directory(&self, folder: &str) -> Result<Vec<RemoteFileEntry>, IngestError> {
        let dir = PathBuf::from(folder);

        let listing = self
            .blocking(move |conn| {
                conn.sftp
                    .readdir(&dir)
                    .with_context(|| format!("readdir {} failed", dir.display()))
            })
            .await
            .map_err(|e| classify(e, |message| IngestError::listing(folder, message)))?;

        let entries = entries_from_listing(listing);
        debug!(count = entries.len(), "Listed remote folder");
        Ok(entries)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn download_to(
        &self,
        remote_path: &RemotePath,
        local_destination: &Path,
    ) -> Result<u64, IngestError> {
        let remote = PathBuf::from(remote_path.as_str());
        let destination = local_destination.to_path_buf();

        let bytes = self
            .blocking(move |conn| {
                let mut file = conn
                    .sftp
                    .open(&remote)
                    .with_context(|| format!("open {} failed", remote.display()))?;
                staging::copy_to_staged(&mut file, &destination)
                    .with_context(|| format!("writing {} failed", destination.display()))
            })
            .await
            .map_err(|e| classify(e, |message| IngestError::transfer(remote_path.as_str(), message)))?;

        debug!(bytes, "Download complete");
        Ok(bytes)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn disconnect(&self) -> Result<(), IngestError> {
        self.blocking(|conn| {
            conn.session
                .disconnect(None, "sftp-ingest pass complete", None)
                .context("SSH disconnect failed")
        })
        .await
        .map_err(|e| IngestError::Connection(format!("{e:#}")))?;

        debug!("SFTP session closed");
        Ok(())
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// libssh2 codes that mean the transport is gone:
/// SOCKET_SEND, TIMEOUT, SOCKET_DISCONNECT, SOCKET_TIMEOUT, SOCKET_RECV
const SESSION_LOST_CODES: [i32; 5] = [-7, -9, -13, -30, -43];

/// Whether any cause in the chain is a libssh2 transport failure
///
/// Reads through the staged copy surface as `io::Error` wrapping the
/// `ssh2::Error`, so both shapes are checked.
fn session_lost(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        let ssh = cause.downcast_ref::<ssh2::Error>().or_else(|| {
            cause
                .downcast_ref::<std::io::Error>()
                .and_then(|io| io.get_ref())
                .and_then(|inner| inner.downcast_ref::<ssh2::Error>())
        });

        matches!(
            ssh.map(ssh2::Error::code),
            Some(ErrorCode::Session(code)) if SESSION_LOST_CODES.contains(&code)
        )
    })
}

/// Lost sessions become `IngestError::Connection`, everything else `otherwise`
fn classify(error: anyhow::Error, otherwise: impl FnOnce(String) -> IngestError) -> IngestError {
    let message = format!("{error:#}");
    if session_lost(&error) {
        IngestError::Connection(message)
    } else {
        otherwise(message)
    }
}

// ============================================================================
// Listing conversion
// ============================================================================

/// Converts a raw `readdir` result into port-level entries
///
/// libssh2 already drops `.` and `..` and joins each name onto the listed
/// folder, so the path is used as-is.
pub(crate) fn entries_from_listing(listing: Vec<(PathBuf, FileStat)>) -> Vec<RemoteFileEntry> {
    listing
        .into_iter()
        .map(|(path, stat)| {
            let full_path = path.to_string_lossy().into_owned();
            let last_modified = modified_from_stat(&full_path, stat.mtime);
            RemoteFileEntry {
                full_path,
                is_directory: stat.is_dir(),
                last_modified,
            }
        })
        .collect()
}

/// Converts an SFTP `mtime` (seconds since the epoch, UTC) into a timestamp
///
/// Servers may omit the attribute; such entries get the epoch so they still
/// produce a stable dedup key.
fn modified_from_stat(path: &str, mtime: Option<u64>) -> DateTime<FixedOffset> {
    let parsed = mtime
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    match parsed {
        Some(t) => t.fixed_offset(),
        None => {
            warn!(path, ?mtime, "Entry has no usable mtime, using the epoch");
            DateTime::<Utc>::default().fixed_offset()
        }
    }
}
