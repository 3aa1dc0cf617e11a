//! Long-running queue consumer.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Idle ─► Dequeuing ─► Processing ─► Acknowledging ─► Idle
//!  │          │ (empty poll / receive error)
//!  │          └──────────────────────► Idle
//!  └─► Stopped   (shutdown observed before a new dequeue)
//! ```
//!
//! Shutdown is only observed between iterations: a task that has been
//! received always runs to completion and is acknowledged.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::orchestrator::ScrapeOrchestrator;
use crate::traits::store::TaskQueue;
use crate::types::ReceivedTask;

/// Configuration for the task worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Long-poll wait per receive
    pub poll_wait: Duration,
    /// Pause after a failed receive
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_wait: Duration::from_secs(20),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_wait(mut self, wait: Duration) -> Self {
        self.poll_wait = wait;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }
}

/// Where the worker loop is.
#[derive(Debug)]
pub enum WorkerState {
    Idle,
    Dequeuing,
    Processing(ReceivedTask),
    /// Holds the ack token of the task just processed
    Acknowledging(String),
    Stopped,
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub succeeded: usize,
    pub failed: usize,
    pub empty_polls: usize,
    pub receive_errors: usize,
    pub ack_failures: usize,
}

impl WorkerStats {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Consumes scrape tasks one at a time.
pub struct TaskWorker {
    queue: Arc<dyn TaskQueue>,
    orchestrator: Arc<ScrapeOrchestrator>,
    config: WorkerConfig,
}

impl TaskWorker {
    pub fn new(queue: Arc<dyn TaskQueue>, orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self {
            queue,
            orchestrator,
            config: WorkerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> WorkerStats {
        info!(
            poll_wait_secs = self.config.poll_wait.as_secs(),
            "Scrape worker started"
        );

        let mut stats = WorkerStats::default();
        let mut state = WorkerState::Idle;

        loop {
            state = match state {
                WorkerState::Stopped => break,
                state => self.step(state, &shutdown, &mut stats).await,
            };
        }

        info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Scrape worker stopped"
        );
        stats
    }

    /// Perform one transition.
    pub async fn step(
        &self,
        state: WorkerState,
        shutdown: &CancellationToken,
        stats: &mut WorkerStats,
    ) -> WorkerState {
        match state {
            WorkerState::Idle => {
                if shutdown.is_cancelled() {
                    WorkerState::Stopped
                } else {
                    WorkerState::Dequeuing
                }
            }

            WorkerState::Dequeuing => match self.queue.receive(self.config.poll_wait).await {
                Ok(Some(received)) => WorkerState::Processing(received),
                Ok(None) => {
                    debug!("No tasks in queue, waiting...");
                    stats.empty_polls += 1;
                    WorkerState::Idle
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive from queue");
                    stats.receive_errors += 1;
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                    WorkerState::Idle
                }
            },

            WorkerState::Processing(received) => {
                let task = &received.task;
                info!(
                    task_id = %task.task_id,
                    county = %task.county,
                    state = %task.state,
                    "Processing scrape task"
                );

                match self
                    .orchestrator
                    .run_tracked(&task.county, &task.state, Some(&task.task_id))
                    .await
                {
                    Ok(result) => {
                        stats.succeeded += 1;
                        info!(
                            task_id = %task.task_id,
                            documents = result.document_count,
                            projects = result.project_count,
                            "Task completed successfully"
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        error!(task_id = %task.task_id, error = %e, "Task failed");
                    }
                }
                WorkerState::Acknowledging(received.ack_token)
            }

            WorkerState::Acknowledging(ack_token) => {
                if let Err(e) = self.queue.delete(&ack_token).await {
                    stats.ack_failures += 1;
                    warn!(error = %e, "Failed to delete message, it may be redelivered");
                }
                WorkerState::Idle
            }

            WorkerState::Stopped => WorkerState::Stopped,
        }
    }
}
