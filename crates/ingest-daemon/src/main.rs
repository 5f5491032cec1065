//! sftp-ingest daemon - polls SFTP folders and ingests new files
//!
//! Runs as a long-lived service:
//! - Connects to the configured SFTP server once per poll interval
//! - Downloads files not yet recorded in the SQLite record store
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `main` loads and validates the configuration, initializes tracing, wires
//! the SFTP client and SQLite store into a `SyncScheduler`, and hands it a
//! `CancellationToken` that the signal handler cancels. With `--once` a
//! single pass runs and its outcome becomes the exit status.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ingest_cache::{DatabasePool, SqliteRecordStore};
use ingest_core::config::{Config, LoggingConfig};
use ingest_core::ports::IRecordStore;
use ingest_sftp::SftpDirectoryClient;
use ingest_sync::{PassOutcome, SchedulerSettings, SchedulerState, SyncScheduler};

// ============================================================================
// Command line
// ============================================================================

/// Polls SFTP folders and downloads files that were not ingested yet
#[derive(Debug, Parser)]
#[command(name = "sftp-ingestd", version)]
struct Args {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/sftp-ingest/config.yaml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

// ============================================================================
// Configuration and tracing
// ============================================================================

/// Loads the configuration and applies environment overrides
///
/// An explicit path must exist. The default path is optional; when it is
/// missing the built-in defaults are used and validation reports what is
/// still required.
fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            } else {
                Config::default()
            }
        }
    };

    config.apply_env_overrides();
    Ok(config)
}

/// Fails with every validation error listed
fn check_config(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }

    let details: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    bail!("Invalid configuration:\n{}", details.join("\n"))
}

/// `RUST_LOG` wins over the configured level
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .with_target(true);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the database pool and the scheduler for the lifetime of the process
struct DaemonService {
    db_pool: DatabasePool,
    store: Arc<SqliteRecordStore>,
    scheduler: SyncScheduler,
}

impl DaemonService {
    /// Opens the database and wires the adapters into a scheduler
    async fn new(config: &Config) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open database")?;
        let store = Arc::new(SqliteRecordStore::new(db_pool.pool().clone()));
        let client = Arc::new(SftpDirectoryClient::new(config.sftp.clone()));

        info!(
            endpoint = %client.endpoint(),
            database = %config.database.path.display(),
            "Adapters ready"
        );

        let scheduler = SyncScheduler::new(
            client,
            store.clone(),
            SchedulerSettings::from_config(&config.sync),
        );

        Ok(Self {
            db_pool,
            store,
            scheduler,
        })
    }

    /// Runs the polling loop until `shutdown` is cancelled
    async fn run(&self, shutdown: CancellationToken) {
        let observer = tokio::spawn(log_state_changes(
            self.scheduler.subscribe(),
            self.scheduler.settings().poll_interval.as_secs(),
        ));

        self.scheduler.run(shutdown).await;

        if let Err(e) = observer.await {
            warn!(error = %e, "State observer task failed");
        }
    }

    /// Runs exactly one pass; connect and pass failures become errors
    async fn run_once(&self) -> Result<()> {
        self.store
            .ensure_ready()
            .await
            .context("Record store is not ready")?;

        match self.scheduler.run_pass().await {
            PassOutcome::Completed(report) => {
                if report.has_failures() {
                    warn!(failures = report.failures.len(), "Pass completed with failures");
                }
                if report.files_downloaded > 0 {
                    if let Err(e) = self.log_recent(report.files_downloaded).await {
                        warn!(error = %format!("{e:#}"), "Could not list ingested files");
                    }
                }
                Ok(())
            }
            PassOutcome::ConnectFailed(e) => {
                Err(anyhow::Error::new(e).context("Could not connect to the SFTP server"))
            }
            PassOutcome::PassFailed(e) => Err(anyhow::Error::new(e).context("Ingestion pass failed")),
        }
    }

    /// Logs the `limit` most recently ingested records, newest first
    async fn log_recent(&self, limit: u32) -> Result<usize> {
        let records = self
            .store
            .recent(limit)
            .await
            .context("Failed to read recent records")?;

        for record in &records {
            info!(
                path = %record.file_path(),
                creation_time = %record.creation_time(),
                "Recently ingested"
            );
        }

        Ok(records.len())
    }

    async fn close(&self) {
        self.db_pool.close().await;
    }
}

/// Logs scheduler waits until the scheduler terminates
async fn log_state_changes(mut state: watch::Receiver<SchedulerState>, poll_secs: u64) {
    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();
        match current {
            SchedulerState::Waiting => info!(next_pass_secs = poll_secs, "Waiting for next pass"),
            SchedulerState::Terminated => break,
            _ => {}
        }
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    check_config(&config)?;

    init_tracing(&config.logging);
    info!(once = args.once, "sftp-ingest daemon starting (sftp-ingestd)");

    let service = DaemonService::new(&config).await?;

    let result = if args.once {
        service.run_once().await
    } else {
        let shutdown_token = CancellationToken::new();

        let signal_token = shutdown_token.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        service.run(shutdown_token).await;
        Ok(())
    };

    service.close().await;

    match &result {
        Ok(()) => info!("sftp-ingest daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "sftp-ingest daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
