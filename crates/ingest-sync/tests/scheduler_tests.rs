//! Integration tests for SyncScheduler
//!
//! Loop timing tests run on a paused clock with fully in-memory fakes, so
//! the clock only advances when every task is parked on a timer.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use ingest_sync::{PassOutcome, SchedulerSettings, SchedulerState, SyncScheduler};

use common::{file, FakeRemote, FakeStore};

// ============================================================================
// Test helpers
// ============================================================================

fn settings(local: PathBuf, poll_secs: u64) -> SchedulerSettings {
    SchedulerSettings {
        remote_folder_paths: vec!["/in".to_string()],
        local_folder_path: local,
        poll_interval: Duration::from_secs(poll_secs),
    }
}

fn scheduler(remote: &FakeRemote, store: &Arc<FakeStore>, settings: SchedulerSettings) -> Arc<SyncScheduler> {
    Arc::new(SyncScheduler::new(
        Arc::new(remote.clone()),
        store.clone(),
        settings,
    ))
}

// ============================================================================
// run_pass
// ============================================================================

#[tokio::test]
async fn test_pass_completes_and_disconnects_once() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1), file("/in/b.txt", 2)]);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let outcome = scheduler.run_pass().await;

    let report = outcome.report().expect("pass should complete");
    assert_eq!(report.files_downloaded, 2);
    assert_eq!(remote.sessions_opened(), 1);
    assert_eq!(remote.disconnects(), 1);
    assert_eq!(store.records().len(), 2);
}

#[tokio::test]
async fn test_connect_failure_skips_pass_without_mutation() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    remote.refuse_connections(true);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let outcome = scheduler.run_pass().await;

    assert!(matches!(outcome, PassOutcome::ConnectFailed(_)));
    assert_eq!(remote.disconnects(), 0);
    assert!(remote.listed().is_empty());
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_failed_pass_still_disconnects() {
    let root = TempDir::new().unwrap();
    let blocker = root.path().join("inbox");
    std::fs::write(&blocker, b"file in the way").unwrap();

    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(blocker, 60));

    let outcome = scheduler.run_pass().await;

    assert!(matches!(outcome, PassOutcome::PassFailed(_)));
    assert_eq!(remote.sessions_opened(), 1);
    assert_eq!(remote.disconnects(), 1);
}

#[tokio::test]
async fn test_dropped_session_fails_pass_and_still_disconnects() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    remote.drop_connection_at("/in/a.txt");
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let outcome = scheduler.run_pass().await;

    assert!(matches!(outcome, PassOutcome::PassFailed(_)));
    assert_eq!(remote.disconnects(), 1);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_disconnect_failure_is_not_fatal() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    remote.fail_disconnect();
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let outcome = scheduler.run_pass().await;

    assert!(outcome.report().is_some());
    assert_eq!(store.records().len(), 1);
}

#[tokio::test]
async fn test_listing_failure_still_completes_pass() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    // "/in" was never scripted, so listing it fails
    let outcome = scheduler.run_pass().await;

    assert_eq!(outcome.report().map(|r| r.folders_failed), Some(1));
    assert_eq!(remote.disconnects(), 1);
}

// ============================================================================
// run loop
// ============================================================================

#[tokio::test]
async fn test_initial_state_is_idle() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn test_cancelled_before_start_runs_no_pass() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let token = CancellationToken::new();
    token.cancel();
    scheduler.run(token).await;

    assert_eq!(remote.connect_attempts(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Terminated);
}

#[tokio::test]
async fn test_cancel_during_wait_exits_promptly() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new().with_folder("/in", vec![file("/in/a.txt", 1)]);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 3600));
    let mut state = scheduler.subscribe();

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let token = token.clone();
        async move { scheduler.run(token).await }
    });

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == SchedulerState::Waiting),
    )
    .await
    .expect("scheduler should reach Waiting")
    .unwrap();

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop well before the poll interval")
        .unwrap();

    assert_eq!(remote.connect_attempts(), 1);
    assert_eq!(remote.disconnects(), 1);
    assert_eq!(store.records().len(), 1);
    assert_eq!(*state.borrow(), SchedulerState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_passes_repeat_every_poll_interval() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.refuse_connections(true);
    let store = Arc::new(FakeStore::new());
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let token = token.clone();
        async move { scheduler.run(token).await }
    });

    // Passes at t=0, 60 and 120
    tokio::time::sleep(Duration::from_secs(150)).await;
    token.cancel();
    handle.await.unwrap();

    assert_eq!(remote.connect_attempts(), 3);
    assert!(store.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_store_not_ready_is_retried_each_interval() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.refuse_connections(true);
    let store = Arc::new(FakeStore::failing_ready(2));
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let token = token.clone();
        async move { scheduler.run(token).await }
    });

    // ensure_ready fails at t=0 and t=60, succeeds at t=120, first pass follows
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(store.ready_calls(), 2);
    assert_eq!(remote.connect_attempts(), 0);

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(store.ready_calls(), 3);
    assert_eq!(remote.connect_attempts(), 1);

    token.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_store_not_ready_terminates() {
    let local = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    let store = Arc::new(FakeStore::failing_ready(usize::MAX));
    let scheduler = scheduler(&remote, &store, settings(local.path().to_path_buf(), 60));

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let token = token.clone();
        async move { scheduler.run(token).await }
    });

    tokio::time::sleep(Duration::from_secs(10)).await;
    token.cancel();
    handle.await.unwrap();

    assert_eq!(remote.connect_attempts(), 0);
    assert_eq!(scheduler.state(), SchedulerState::Terminated);
}
