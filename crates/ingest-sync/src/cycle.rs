//! Ingestion cycle - one pass over all configured remote folders
//!
//! For each folder, in configured order, the cycle lists the folder and walks
//! its entries in listing order:
//!
//! 1. Directories are counted and skipped (no recursion)
//! 2. The entry's dedup key `(path, normalized mtime)` is looked up
//! 3. Unknown files are downloaded to `local_folder / file_name(path)`
//! 4. A record is inserted only after the download completed
//!
//! Each failure is contained at the scope reported by `IngestError::scope()`:
//! a bad entry never affects its siblings, a folder that cannot be listed
//! never affects other folders. Pass-scoped errors (an unusable local
//! destination, a session that dropped mid-pass) end the pass early.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument};

use ingest_core::domain::{DomainError, FailureScope, IngestError, RemoteFileEntry, RemotePath};
use ingest_core::ports::{IRecordStore, IRemoteSession};

// ============================================================================
// CycleReport
// ============================================================================

/// Summary of a completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Files downloaded and recorded during this pass
    pub files_downloaded: u32,
    /// Files skipped because their dedup key was already recorded
    pub files_skipped: u32,
    /// Directory entries skipped
    pub directories_skipped: u32,
    /// Folders whose listing failed
    pub folders_failed: u32,
    /// Entry and folder failures, in the order they happened
    pub failures: Vec<EntryFailure>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl CycleReport {
    /// Whether any entry or folder failed during the pass
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record_folder_failure(&mut self, folder: &str, error: &IngestError) {
        self.folders_failed += 1;
        self.failures.push(EntryFailure {
            path: folder.to_string(),
            message: error.to_string(),
        });
    }
}

/// A failure recorded during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    /// Remote path of the entry, or the folder for listing failures
    pub path: String,
    /// Human-readable cause
    pub message: String,
}

/// What happened to a single listed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Downloaded,
    AlreadyIngested,
    Directory,
}

/// Local path a remote file is downloaded to
///
/// Only the base name of the remote path is kept, so distinct remote files
/// with the same name overwrite each other locally.
///
/// # Errors
/// Returns `DomainError::MissingFileName` if the path has no usable base name
pub fn local_destination(local_folder: &Path, remote_path: &RemotePath) -> Result<PathBuf, DomainError> {
    Ok(local_folder.join(remote_path.file_name()?))
}

// ============================================================================
// IngestionCycle
// ============================================================================

/// Runs ingestion passes against an open session
pub struct IngestionCycle {
    store: Arc<dyn IRecordStore>,
    local_folder: PathBuf,
}

impl IngestionCycle {
    /// Creates a cycle that records into `store` and downloads into `local_folder`
    pub fn new(store: Arc<dyn IRecordStore>, local_folder: PathBuf) -> Self {
        Self {
            store,
            local_folder,
        }
    }

    /// Runs one pass over `folders` using `session`
    ///
    /// The session is borrowed; closing it is the caller's job whatever this
    /// returns.
    ///
    /// # Errors
    /// Returns the first pass-scoped error: `IngestError::LocalIo` if the
    /// local destination folder cannot be created, `IngestError::Connection`
    /// if the session drops. Every other failure is recorded in the report.
    #[instrument(skip(self, session), fields(local_folder = %self.local_folder.display()))]
    pub async fn run_once(
        &self,
        session: &dyn IRemoteSession,
        folders: &[String],
    ) -> Result<CycleReport, IngestError> {
        let start = Instant::now();
        self.prepare_local_folder().await?;

        let mut report = CycleReport::default();

        for folder in folders {
            self.scan_folder(session, folder, &mut report).await?;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            downloaded = report.files_downloaded,
            skipped = report.files_skipped,
            directories = report.directories_skipped,
            folders_failed = report.folders_failed,
            failures = report.failures.len(),
            duration_ms = report.duration_ms,
            "Ingestion pass complete"
        );

        Ok(report)
    }

    async fn prepare_local_folder(&self) -> Result<(), IngestError> {
        tokio::fs::create_dir_all(&self.local_folder)
            .await
            .map_err(|e| IngestError::LocalIo {
                path: self.local_folder.clone(),
                message: e.to_string(),
            })
    }

    async fn scan_folder(
        &self,
        session: &dyn IRemoteSession,
        folder: &str,
        report: &mut CycleReport,
    ) -> Result<(), IngestError> {
        let entries = match session.list_directory(folder).await {
            Ok(entries) => entries,
            Err(e) if e.scope() == FailureScope::Pass => return Err(e),
            Err(e) => {
                error!(folder, error = %e, "Listing failed, skipping folder");
                report.record_folder_failure(folder, &e);
                return Ok(());
            }
        };

        debug!(folder, entries = entries.len(), "Scanning folder");

        for entry in &entries {
            match self.ingest_entry(session, entry).await {
                Ok(EntryOutcome::Downloaded) => report.files_downloaded += 1,
                Ok(EntryOutcome::AlreadyIngested) => report.files_skipped += 1,
                Ok(EntryOutcome::Directory) => report.directories_skipped += 1,
                Err(e) => match e.scope() {
                    FailureScope::Pass => return Err(e),
                    FailureScope::Folder => {
                        error!(
                            folder,
                            path = %entry.full_path,
                            error = %e,
                            "Folder failed mid-scan, skipping rest"
                        );
                        report.record_folder_failure(folder, &e);
                        return Ok(());
                    }
                    FailureScope::Entry => {
                        error!(
                            path = %entry.full_path,
                            last_modified = %entry.last_modified,
                            error = %e,
                            "Failed to ingest entry"
                        );
                        report.failures.push(EntryFailure {
                            path: entry.full_path.clone(),
                            message: e.to_string(),
                        });
                    }
                },
            }
        }

        Ok(())
    }

    async fn ingest_entry(
        &self,
        session: &dyn IRemoteSession,
        entry: &RemoteFileEntry,
    ) -> Result<EntryOutcome, IngestError> {
        if entry.is_directory {
            debug!(path = %entry.full_path, "Skipping directory");
            return Ok(EntryOutcome::Directory);
        }

        let record = entry.to_record()?;

        if self
            .store
            .exists(record.file_path(), record.creation_time())
            .await?
        {
            debug!(path = %record.file_path(), "Already ingested");
            return Ok(EntryOutcome::AlreadyIngested);
        }

        let destination = local_destination(&self.local_folder, record.file_path())?;
        let bytes = session.download_to(record.file_path(), &destination).await?;

        // Only a completed download earns a record
        self.store.insert(&record).await?;

        info!(
            path = %record.file_path(),
            creation_time = %record.creation_time(),
            destination = %destination.display(),
            bytes,
            "File ingested"
        );

        Ok(EntryOutcome::Downloaded)
    }
}
