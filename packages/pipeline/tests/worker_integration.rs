//! Queue consumer behaviour against the in-memory queue.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use dci_pipeline::stores::MemoryStore;
use dci_pipeline::testing::{MockBrowserLauncher, MockCompletion};
use dci_pipeline::{
    ProjectStore, ScrapeTask, TaskQueue, TaskStatus, TaskWorker, WorkerConfig, WorkerState,
    WorkerStats,
};
use tokio_util::sync::CancellationToken;

fn fast_config() -> WorkerConfig {
    WorkerConfig::default()
        .with_poll_wait(Duration::from_millis(10))
        .with_error_backoff(Duration::from_millis(10))
}

fn worker(store: &Arc<MemoryStore>) -> TaskWorker {
    let launcher = MockBrowserLauncher::new(site_with_two_documents());
    let completion = completion_for_two_documents();
    TaskWorker::new(
        store.clone(),
        Arc::new(orchestrator(&launcher, &completion, store)),
    )
    .with_config(fast_config())
}

/// Create a task row and put its message on the queue.
async fn enqueue(store: &MemoryStore, county: &str, state: &str) -> String {
    let location_id = store.find_or_create_location(county, state).await.unwrap();
    let task_id = store.create_task(&location_id, Some("test")).await.unwrap();
    store
        .send(&ScrapeTask::new(&task_id, &location_id, county, state))
        .await
        .unwrap();
    task_id
}

#[tokio::test]
async fn test_task_moves_through_every_state() {
    let store = Arc::new(MemoryStore::new());
    let task_id = enqueue(&store, COUNTY, STATE).await;
    let worker = worker(&store);
    let shutdown = CancellationToken::new();
    let mut stats = WorkerStats::default();

    let state = worker.step(WorkerState::Idle, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Dequeuing));

    let state = worker.step(state, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Processing(ref r) if r.task.task_id == task_id));
    assert_eq!(store.unacknowledged_messages(), 1);

    let state = worker.step(state, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Acknowledging(_)));
    assert_eq!(store.task(&task_id).unwrap().status, TaskStatus::Success);

    let state = worker.step(state, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Idle));
    assert_eq!(store.unacknowledged_messages(), 0);
    assert_eq!(stats.succeeded, 1);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_task() {
    let store = Arc::new(MemoryStore::new());
    let task_id = enqueue(&store, COUNTY, STATE).await;
    let worker = worker(&store);
    let shutdown = CancellationToken::new();
    let mut stats = WorkerStats::default();

    let state = worker.step(WorkerState::Dequeuing, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Processing(_)));

    shutdown.cancel();

    let state = worker.step(state, &shutdown, &mut stats).await;
    let state = worker.step(state, &shutdown, &mut stats).await;
    let state = worker.step(state, &shutdown, &mut stats).await;

    assert!(matches!(state, WorkerState::Stopped));
    assert_eq!(store.task(&task_id).unwrap().status, TaskStatus::Success);
    assert_eq!(store.unacknowledged_messages(), 0);
}

#[tokio::test]
async fn test_run_processes_queue_until_cancelled() {
    let store = Arc::new(MemoryStore::new());
    let first = enqueue(&store, COUNTY, STATE).await;
    let second = enqueue(&store, "Nowhere", "ZZ").await;

    let worker = worker(&store);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.run(shutdown).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let done = [&first, &second]
                .iter()
                .all(|id| store.task(id).is_some_and(|t| t.status.is_terminal()));
            if done && store.unacknowledged_messages() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    shutdown.cancel();
    let stats = handle.await.unwrap();

    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.processed(), 2);
    assert_eq!(store.task(&first).unwrap().status, TaskStatus::Success);
    assert_eq!(store.task(&second).unwrap().status, TaskStatus::Error);
    assert_eq!(store.pending_messages(), 0);
}

#[tokio::test]
async fn test_receive_error_backs_off_and_recovers() {
    let store = Arc::new(MemoryStore::new().with_failing_receives(1));
    let task_id = enqueue(&store, COUNTY, STATE).await;
    let worker = worker(&store);
    let shutdown = CancellationToken::new();
    let mut stats = WorkerStats::default();

    let state = worker.step(WorkerState::Dequeuing, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Idle));
    assert_eq!(stats.receive_errors, 1);

    let state = worker.step(WorkerState::Dequeuing, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Processing(ref r) if r.task.task_id == task_id));
}

#[tokio::test]
async fn test_backoff_is_cut_short_by_shutdown() {
    let store = Arc::new(MemoryStore::new().with_failing_receives(1));
    let launcher = MockBrowserLauncher::new(site_with_no_results());
    let worker = TaskWorker::new(
        store.clone(),
        Arc::new(orchestrator(&launcher, &MockCompletion::new(), &store)),
    )
    .with_config(WorkerConfig::default().with_error_backoff(Duration::from_secs(60)));

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let mut stats = WorkerStats::default();

    let state = tokio::time::timeout(
        Duration::from_secs(1),
        worker.step(WorkerState::Dequeuing, &shutdown, &mut stats),
    )
    .await
    .unwrap();

    assert!(matches!(state, WorkerState::Idle));
    let state = worker.step(state, &shutdown, &mut stats).await;
    assert!(matches!(state, WorkerState::Stopped));
}

#[tokio::test]
async fn test_delete_failure_is_tolerated() {
    let store = Arc::new(MemoryStore::new().with_failing_deletes());
    enqueue(&store, COUNTY, STATE).await;
    let worker = worker(&store);
    let shutdown = CancellationToken::new();
    let mut stats = WorkerStats::default();

    let mut state = WorkerState::Dequeuing;
    for _ in 0..3 {
        state = worker.step(state, &shutdown, &mut stats).await;
    }

    assert!(matches!(state, WorkerState::Idle));
    assert_eq!(stats.ack_failures, 1);
    // Left in flight for redelivery.
    assert_eq!(store.unacknowledged_messages(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_stops_immediately() {
    let store = Arc::new(MemoryStore::new());
    enqueue(&store, COUNTY, STATE).await;
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let stats = worker(&store).run(shutdown).await;

    assert_eq!(stats, WorkerStats::default());
    assert_eq!(store.pending_messages(), 1);
    assert_eq!(store.receive_calls(), 0);
}
