//! In-memory fakes for the remote and store ports
//!
//! Both fakes keep their state behind a `std::sync::Mutex` that is never held
//! across an await, and expose counters so tests can assert on side effects.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, TimeZone};

use ingest_core::domain::{IngestError, IngestedFileRecord, ModifiedTime, RemoteFileEntry, RemotePath};
use ingest_core::ports::{IRecordStore, IRemoteDirectoryClient, IRemoteSession};

// ============================================================================
// Fixtures
// ============================================================================

/// 2024-05-01 at the given hour, UTC
pub fn at(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 5, 1, hour, 0, 0)
        .unwrap()
}

pub fn file(path: &str, hour: u32) -> RemoteFileEntry {
    RemoteFileEntry::file(path, at(hour))
}

pub fn dir(path: &str) -> RemoteFileEntry {
    RemoteFileEntry::directory(path, at(0))
}

pub fn record(path: &str, hour: u32) -> IngestedFileRecord {
    IngestedFileRecord::new(
        RemotePath::new(path.to_string()).unwrap(),
        ModifiedTime::normalize(&at(hour)),
    )
}

/// Content the fake server serves for `path`
pub fn content_of(path: &str) -> String {
    format!("contents of {path}")
}

// ============================================================================
// FakeRemote
// ============================================================================

#[derive(Default)]
pub struct RemoteState {
    listings: HashMap<String, Vec<RemoteFileEntry>>,
    failing_folders: HashSet<String>,
    failing_downloads: HashSet<String>,
    dropping_downloads: HashSet<String>,
    refuse_connections: bool,
    fail_disconnect: bool,
    connect_attempts: usize,
    sessions_opened: usize,
    disconnects: usize,
    listed: Vec<String>,
    downloads: Vec<(String, PathBuf)>,
}

/// Scriptable SFTP server
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folder(self, folder: &str, entries: Vec<RemoteFileEntry>) -> Self {
        self.set_folder(folder, entries);
        self
    }

    pub fn set_folder(&self, folder: &str, entries: Vec<RemoteFileEntry>) {
        self.state
            .lock()
            .unwrap()
            .listings
            .insert(folder.to_string(), entries);
    }

    pub fn fail_listing(&self, folder: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_folders
            .insert(folder.to_string());
    }

    pub fn fail_download(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_downloads
            .insert(path.to_string());
    }

    /// The session drops while downloading `path`
    pub fn drop_connection_at(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .dropping_downloads
            .insert(path.to_string());
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_connections = refuse;
    }

    pub fn fail_disconnect(&self) {
        self.state.lock().unwrap().fail_disconnect = true;
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().sessions_opened
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn listed(&self) -> Vec<String> {
        self.state.lock().unwrap().listed.clone()
    }

    /// Remote paths downloaded so far, in order
    pub fn downloads(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .downloads
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Opens a session directly, bypassing `connect` bookkeeping
    pub fn session(&self) -> FakeSession {
        FakeSession {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait::async_trait]
impl IRemoteDirectoryClient for FakeRemote {
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, IngestError> {
        let mut state = self.state.lock().unwrap();
        state.connect_attempts += 1;

        if state.refuse_connections {
            return Err(IngestError::Connection("connection refused".to_string()));
        }

        state.sessions_opened += 1;
        drop(state);

        Ok(Box::new(self.session()))
    }
}

pub struct FakeSession {
    state: Arc<Mutex<RemoteState>>,
}

#[async_trait::async_trait]
impl IRemoteSession for FakeSession {
    async fn list_directory(&self, folder: &str) -> Result<Vec<RemoteFileEntry>, IngestError> {
        let mut state = self.state.lock().unwrap();
        state.listed.push(folder.to_string());

        if state.failing_folders.contains(folder) {
            return Err(IngestError::listing(folder, "permission denied"));
        }

        state
            .listings
            .get(folder)
            .cloned()
            .ok_or_else(|| IngestError::listing(folder, "no such folder"))
    }

    async fn download_to(
        &self,
        remote_path: &RemotePath,
        local_destination: &Path,
    ) -> Result<u64, IngestError> {
        let mut state = self.state.lock().unwrap();

        if state.failing_downloads.contains(remote_path.as_str()) {
            return Err(IngestError::transfer(remote_path.as_str(), "connection reset"));
        }
        if state.dropping_downloads.contains(remote_path.as_str()) {
            return Err(IngestError::Connection("session closed by peer".to_string()));
        }

        let body = content_of(remote_path.as_str());
        std::fs::write(local_destination, &body)
            .map_err(|e| IngestError::transfer(remote_path.as_str(), e))?;

        state
            .downloads
            .push((remote_path.to_string(), local_destination.to_path_buf()));
        Ok(body.len() as u64)
    }

    async fn disconnect(&self) -> Result<(), IngestError> {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;

        if state.fail_disconnect {
            return Err(IngestError::Connection("socket already closed".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// FakeStore
// ============================================================================

#[derive(Default)]
struct StoreState {
    records: Vec<IngestedFileRecord>,
    ready_failures_left: usize,
    ready_calls: usize,
    failing_exists: HashSet<String>,
    fail_inserts: bool,
}

/// Record store that keeps everything in a `Vec`
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<IngestedFileRecord>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().records = records;
        store
    }

    /// `ensure_ready` fails this many times before succeeding
    pub fn failing_ready(times: usize) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().ready_failures_left = times;
        store
    }

    pub fn fail_exists_for(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_exists
            .insert(path.to_string());
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_inserts = true;
    }

    pub fn records(&self) -> Vec<IngestedFileRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn ready_calls(&self) -> usize {
        self.state.lock().unwrap().ready_calls
    }
}

#[async_trait::async_trait]
impl IRecordStore for FakeStore {
    async fn ensure_ready(&self) -> Result<(), IngestError> {
        let mut state = self.state.lock().unwrap();
        state.ready_calls += 1;

        if state.ready_failures_left > 0 {
            state.ready_failures_left -= 1;
            return Err(IngestError::StoreUnavailable("database is locked".to_string()));
        }
        Ok(())
    }

    async fn exists(
        &self,
        file_path: &RemotePath,
        creation_time: &ModifiedTime,
    ) -> Result<bool, IngestError> {
        let state = self.state.lock().unwrap();

        if state.failing_exists.contains(file_path.as_str()) {
            return Err(IngestError::StoreUnavailable("disk I/O error".to_string()));
        }

        Ok(state
            .records
            .iter()
            .any(|r| r.file_path() == file_path && r.creation_time() == creation_time))
    }

    async fn insert(&self, record: &IngestedFileRecord) -> Result<(), IngestError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_inserts {
            return Err(IngestError::StoreUnavailable("read-only database".to_string()));
        }

        state.records.push(record.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64, IngestError> {
        Ok(self.state.lock().unwrap().records.len() as u64)
    }
}
