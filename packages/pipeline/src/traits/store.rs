//! Persistence, queue and object-storage collaborators.
//!
//! The pipeline never owns durable state; these traits are implemented by
//! [`crate::stores::MemoryStore`] for tests, [`crate::stores::FilesystemObjectStore`]
//! for local document archiving, and the Postgres store behind the
//! `postgres` feature.

use async_trait::async_trait;
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::StoreResult;
use crate::types::{Project, RawDocument, ReceivedTask, ScrapeTask, TaskStatus};

/// Durable records for locations, projects, documents and tasks.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Look up a location by county/state, creating it if absent.
    async fn find_or_create_location(&self, county: &str, state: &str) -> StoreResult<String>;

    /// Persist a reconciled project and return its identifier.
    async fn save_project(&self, location_id: &str, project: &Project) -> StoreResult<String>;

    /// Record documents against a project.
    ///
    /// Idempotent per source URL: a document already recorded is skipped.
    /// `storage` maps source URL to object-storage locator.
    async fn save_documents(
        &self,
        project_id: &str,
        documents: &[&RawDocument],
        storage: &HashMap<String, String>,
    ) -> StoreResult<()>;

    /// Create a queued task for a location.
    async fn create_task(&self, location_id: &str, initiated_by: Option<&str>)
        -> StoreResult<String>;

    /// Move a task to `status`, optionally recording a log line.
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        log: Option<&str>,
    ) -> StoreResult<()>;

    /// Connectivity check.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// At-least-once task queue.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Long-poll for a single task, waiting at most `wait`.
    ///
    /// `Ok(None)` is the normal outcome of an empty poll.
    async fn receive(&self, wait: Duration) -> StoreResult<Option<ReceivedTask>>;

    /// Acknowledge a task so it is not redelivered.
    async fn delete(&self, ack_token: &str) -> StoreResult<()>;

    /// Enqueue a task.
    async fn send(&self, task: &ScrapeTask) -> StoreResult<()>;
}

/// Raw document archive.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `content` unchanged under `bucket`/`key`; returns a locator.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> StoreResult<String>;
}

/// Short, stable fingerprint of a URL used in archive keys.
pub fn short_url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..4])
}

/// Archive key for a document:
/// `raw-documents/<state>/<county>/<date>/<category>_<hash>.<ext>`.
pub fn document_key(state: &str, county: &str, date: NaiveDate, doc: &RawDocument) -> String {
    format!(
        "raw-documents/{}/{}/{}/{}_{}.{}",
        state,
        county,
        date.format("%Y-%m-%d"),
        doc.category,
        short_url_hash(&doc.url),
        doc.archive_extension()
    )
}
