//! sftp-ingest sync - ingestion cycle and scheduler
//!
//! ## Flow
//!
//! ```text
//! SyncScheduler ──connect──→ IRemoteDirectoryClient ──→ IRemoteSession
//!      │                                                      │
//!      └──run_once──→ IngestionCycle ──list/download──────────┘
//!                          │
//!                          └──exists/insert──→ IRecordStore
//! ```
//!
//! The scheduler owns the poll loop and the session lifetime; the cycle
//! owns one traversal of the configured folders and never sees a session
//! it did not receive from the scheduler.

pub mod cycle;
pub mod scheduler;

pub use cycle::{local_destination, CycleReport, EntryFailure, IngestionCycle};
pub use scheduler::{PassOutcome, SchedulerSettings, SchedulerState, SyncScheduler};
