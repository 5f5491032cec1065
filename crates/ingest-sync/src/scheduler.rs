//! Sync scheduler - drives ingestion passes on a fixed poll interval
//!
//! ## States
//!
//! ```text
//! Idle ──→ Connecting ──→ Scanning ──→ Disconnecting ──→ Waiting ──→ Connecting ...
//!              │                                            ▲   │
//!              └──────────── connect failed ────────────────┘   └──→ Terminated
//! ```
//!
//! `Terminated` is only reached through the cancellation token. Connect,
//! pass and disconnect failures are logged and the loop carries on with the
//! next interval. A pass that is already running when cancellation arrives
//! finishes and closes its session before the loop exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ingest_core::config::SyncConfig;
use ingest_core::domain::IngestError;
use ingest_core::ports::{IRecordStore, IRemoteDirectoryClient};

use crate::cycle::{CycleReport, IngestionCycle};

// ============================================================================
// Settings and state
// ============================================================================

/// What the scheduler scans, where it writes, and how often
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Remote folders scanned on every pass, in order
    pub remote_folder_paths: Vec<String>,
    /// Download root
    pub local_folder_path: PathBuf,
    /// Pause between the end of one pass and the start of the next
    pub poll_interval: Duration,
}

impl SchedulerSettings {
    pub fn from_config(sync: &SyncConfig) -> Self {
        Self {
            remote_folder_paths: sync.remote_folder_paths.clone(),
            local_folder_path: sync.local_folder_path.clone(),
            poll_interval: sync.poll_interval_duration(),
        }
    }
}

/// Where the scheduler currently is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, not yet running
    Idle,
    /// Opening a remote session
    Connecting,
    /// Running an ingestion pass
    Scanning,
    /// Closing the remote session
    Disconnecting,
    /// Sleeping until the next pass
    Waiting,
    /// Stopped after cancellation
    Terminated,
}

/// Result of a single pass
#[derive(Debug)]
pub enum PassOutcome {
    /// The pass ran to completion; individual failures are in the report
    Completed(CycleReport),
    /// A session was opened but the pass itself failed
    PassFailed(IngestError),
    /// No session could be opened
    ConnectFailed(IngestError),
}

impl PassOutcome {
    /// The pass report, if the pass completed
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

// ============================================================================
// SyncScheduler
// ============================================================================

/// Polling loop around [`IngestionCycle`]
pub struct SyncScheduler {
    client: Arc<dyn IRemoteDirectoryClient>,
    store: Arc<dyn IRecordStore>,
    cycle: IngestionCycle,
    settings: SchedulerSettings,
    state: watch::Sender<SchedulerState>,
}

impl SyncScheduler {
    /// Creates a scheduler; nothing runs until [`run`](Self::run) or
    /// [`run_pass`](Self::run_pass) is called
    pub fn new(
        client: Arc<dyn IRemoteDirectoryClient>,
        store: Arc<dyn IRecordStore>,
        settings: SchedulerSettings,
    ) -> Self {
        info!(
            folders = settings.remote_folder_paths.len(),
            local_folder = %settings.local_folder_path.display(),
            poll_secs = settings.poll_interval.as_secs(),
            "Creating sync scheduler"
        );

        let cycle = IngestionCycle::new(Arc::clone(&store), settings.local_folder_path.clone());
        let (state, _) = watch::channel(SchedulerState::Idle);

        Self {
            client,
            store,
            cycle,
            settings,
            state,
        }
    }

    /// Subscribes to state changes
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    fn set_state(&self, state: SchedulerState) {
        debug!(?state, "Scheduler state change");
        self.state.send_replace(state);
    }

    /// Runs passes until `cancel` fires
    ///
    /// Makes sure the record store is ready first, retrying on every poll
    /// interval until it is. Never returns an error: every failure inside
    /// the loop is logged and retried on the next interval.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Sync scheduler starting");

        if self.wait_for_store(&cancel).await {
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                self.run_pass().await;

                if cancel.is_cancelled() {
                    break;
                }

                if !self.wait_interval(&cancel).await {
                    break;
                }
            }
        }

        self.set_state(SchedulerState::Terminated);
        info!("Sync scheduler stopped");
    }

    /// Runs one Connecting → Scanning → Disconnecting sequence
    ///
    /// The session is closed on every path that opened one.
    pub async fn run_pass(&self) -> PassOutcome {
        self.set_state(SchedulerState::Connecting);

        let session = match self.client.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Could not connect, skipping pass");
                return PassOutcome::ConnectFailed(e);
            }
        };

        // If this future is dropped or the cycle panics, `disconnect` never
        // runs; dropping the boxed session still closes the SSH channel and
        // its TCP stream, just without a clean goodbye.
        self.set_state(SchedulerState::Scanning);
        let result = self
            .cycle
            .run_once(session.as_ref(), &self.settings.remote_folder_paths)
            .await;

        self.set_state(SchedulerState::Disconnecting);
        if let Err(e) = session.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }

        match result {
            Ok(report) => {
                match self.store.count().await {
                    Ok(total) => info!(total_records = total, "Record store totals"),
                    Err(e) => debug!(error = %e, "Could not count records"),
                }
                PassOutcome::Completed(report)
            }
            Err(e) => {
                error!(error = %e, "Ingestion pass failed");
                PassOutcome::PassFailed(e)
            }
        }
    }

    /// Calls `ensure_ready` until it succeeds; false if cancelled first
    async fn wait_for_store(&self, cancel: &CancellationToken) -> bool {
        loop {
            match self.store.ensure_ready().await {
                Ok(()) => return true,
                Err(e) => {
                    error!(
                        error = %e,
                        retry_secs = self.settings.poll_interval.as_secs(),
                        "Record store not ready, will retry"
                    );
                }
            }

            if !self.wait_interval(cancel).await {
                return false;
            }
        }
    }

    /// Sleeps one poll interval; false if cancelled first
    async fn wait_interval(&self, cancel: &CancellationToken) -> bool {
        self.set_state(SchedulerState::Waiting);

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Cancellation received while waiting");
                false
            }
            _ = tokio::time::sleep(self.settings.poll_interval) => true,
        }
    }
}
