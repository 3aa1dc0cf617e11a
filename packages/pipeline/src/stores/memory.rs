//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{ObjectStore, ProjectStore, TaskQueue};
use crate::types::{DocumentCategory, Project, RawDocument, ReceivedTask, ScrapeTask, TaskStatus};

/// A location row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLocation {
    pub id: String,
    pub county: String,
    pub state: String,
}

/// A saved project and the location it belongs to.
#[derive(Debug, Clone)]
pub struct StoredProject {
    pub id: String,
    pub location_id: String,
    pub project: Project,
}

/// A recorded document.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub project_id: String,
    pub source_url: String,
    pub category: DocumentCategory,
    pub storage_locator: Option<String>,
}

/// A task row with every status transition it went through.
#[derive(Debug, Clone)]
pub struct StoredTask {
    pub location_id: String,
    pub initiated_by: Option<String>,
    pub status: TaskStatus,
    pub history: Vec<(TaskStatus, Option<String>)>,
}

/// An archived object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<ScrapeTask>,
    in_flight: HashMap<String, ScrapeTask>,
}

/// In-memory persistence, queue and object storage.
///
/// Data is lost on drop. Failure switches let tests exercise the paths
/// where a collaborator misbehaves.
#[derive(Default)]
pub struct MemoryStore {
    locations: RwLock<Vec<StoredLocation>>,
    projects: RwLock<Vec<StoredProject>>,
    documents: RwLock<Vec<StoredDocument>>,
    tasks: RwLock<HashMap<String, StoredTask>>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    queue: RwLock<Queue>,

    fail_uploads: AtomicBool,
    fail_project_saves: AtomicBool,
    fail_deletes: AtomicBool,
    failing_receives: AtomicUsize,
    receive_calls: AtomicUsize,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

fn injected(what: &str) -> StoreError {
    StoreError::Database(format!("injected {what} failure").into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload fail.
    pub fn with_failing_uploads(self) -> Self {
        self.fail_uploads.store(true, Ordering::SeqCst);
        self
    }

    /// Make every project save fail.
    pub fn with_failing_project_saves(self) -> Self {
        self.fail_project_saves.store(true, Ordering::SeqCst);
        self
    }

    /// Make every queue acknowledgement fail.
    pub fn with_failing_deletes(self) -> Self {
        self.fail_deletes.store(true, Ordering::SeqCst);
        self
    }

    /// Fail the next `count` queue receives.
    pub fn with_failing_receives(self, count: usize) -> Self {
        self.failing_receives.store(count, Ordering::SeqCst);
        self
    }

    pub fn locations(&self) -> Vec<StoredLocation> {
        read(&self.locations).clone()
    }

    pub fn projects(&self) -> Vec<StoredProject> {
        read(&self.projects).clone()
    }

    pub fn documents(&self) -> Vec<StoredDocument> {
        read(&self.documents).clone()
    }

    pub fn task(&self, task_id: &str) -> Option<StoredTask> {
        read(&self.tasks).get(task_id).cloned()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        read(&self.objects).get(&format!("{bucket}/{key}")).cloned()
    }

    pub fn object_count(&self) -> usize {
        read(&self.objects).len()
    }

    /// Messages waiting to be received.
    pub fn pending_messages(&self) -> usize {
        read(&self.queue).pending.len()
    }

    /// Messages received but never acknowledged.
    pub fn unacknowledged_messages(&self) -> usize {
        read(&self.queue).in_flight.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    fn take_pending(&self) -> Option<ReceivedTask> {
        let mut queue = write(&self.queue);
        let task = queue.pending.pop_front()?;
        let ack_token = Uuid::new_v4().to_string();
        queue.in_flight.insert(ack_token.clone(), task.clone());
        Some(ReceivedTask { task, ack_token })
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_or_create_location(&self, county: &str, state: &str) -> StoreResult<String> {
        let mut locations = write(&self.locations);
        if let Some(existing) = locations
            .iter()
            .find(|l| l.county == county && l.state == state)
        {
            return Ok(existing.id.clone());
        }

        let id = Uuid::new_v4().to_string();
        locations.push(StoredLocation {
            id: id.clone(),
            county: county.to_string(),
            state: state.to_string(),
        });
        Ok(id)
    }

    async fn save_project(&self, location_id: &str, project: &Project) -> StoreResult<String> {
        if self.fail_project_saves.load(Ordering::SeqCst) {
            return Err(injected("project save"));
        }

        let id = Uuid::new_v4().to_string();
        write(&self.projects).push(StoredProject {
            id: id.clone(),
            location_id: location_id.to_string(),
            project: project.clone(),
        });
        Ok(id)
    }

    async fn save_documents(
        &self,
        project_id: &str,
        documents: &[&RawDocument],
        storage: &HashMap<String, String>,
    ) -> StoreResult<()> {
        let mut stored = write(&self.documents);
        for doc in documents {
            if stored.iter().any(|d| d.source_url == doc.url) {
                continue;
            }
            stored.push(StoredDocument {
                project_id: project_id.to_string(),
                source_url: doc.url.clone(),
                category: doc.category,
                storage_locator: storage.get(&doc.url).cloned(),
            });
        }
        Ok(())
    }

    async fn create_task(&self, location_id: &str, initiated_by: Option<&str>) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        write(&self.tasks).insert(
            id.clone(),
            StoredTask {
                location_id: location_id.to_string(),
                initiated_by: initiated_by.map(str::to_string),
                status: TaskStatus::Queued,
                history: vec![(TaskStatus::Queued, None)],
            },
        );
        Ok(id)
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        log: Option<&str>,
    ) -> StoreResult<()> {
        let mut tasks = write(&self.tasks);
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        task.status = status;
        task.history.push((status, log.map(str::to_string)));
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for MemoryStore {
    async fn receive(&self, wait: Duration) -> StoreResult<Option<ReceivedTask>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing_receives
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(injected("receive"));
        }

        if let Some(received) = self.take_pending() {
            return Ok(Some(received));
        }

        // Empty poll: hold for the wait like a long-poll would, then retry once.
        tokio::time::sleep(wait).await;
        Ok(self.take_pending())
    }

    async fn delete(&self, ack_token: &str) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        write(&self.queue).in_flight.remove(ack_token);
        Ok(())
    }

    async fn send(&self, task: &ScrapeTask) -> StoreResult<()> {
        write(&self.queue).pending.push_back(task.clone());
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content: &[u8],
        content_type: &str,
    ) -> StoreResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(injected("upload"));
        }

        let path = format!("{bucket}/{key}");
        write(&self.objects).insert(
            path.clone(),
            StoredObject {
                content: content.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{path}"))
    }
}
