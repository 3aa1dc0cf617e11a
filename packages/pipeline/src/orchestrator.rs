//! One jurisdiction's crawl → extract → reconcile → persist run.
//!
//! # Architecture
//!
//! ```text
//! ScrapeOrchestrator::run(key, county, state)
//!     │
//!     ├─► JurisdictionCatalog::get        (ConfigurationMissing if absent)
//!     ├─► ProjectStore::find_or_create_location
//!     ├─► BrowserLauncher::launch         (interactive launcher for script-rendered sites)
//!     ├─► DocumentCrawler::crawl ─► Browser::close
//!     ├─► ObjectStore::upload             (per document, failures logged)
//!     ├─► ExtractionOracle::extract
//!     ├─► Reconciler::reconcile
//!     └─► ProjectStore::save_project / save_documents (per project, failures logged)
//! ```

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::catalog::{jurisdiction_key, JurisdictionCatalog, JurisdictionSource};
use crate::crawler::{CrawlerConfig, DocumentCrawler};
use crate::error::{Result, ScrapeError};
use crate::oracle::ExtractionOracle;
use crate::reconcile::{ReconcileConfig, Reconciler};
use crate::traits::browser::BrowserLauncher;
use crate::traits::store::{document_key, ObjectStore, ProjectStore};
use crate::types::{Project, RawDocument, TaskStatus};

/// Default archive bucket.
pub const DEFAULT_BUCKET: &str = "data-center-intel-documents-prod";

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub document_count: usize,
    pub project_count: usize,
    pub duration_ms: u64,
}

impl RunResult {
    /// Task log line for this result.
    pub fn summary(&self) -> String {
        if self.document_count == 0 {
            "No documents found".to_string()
        } else {
            format!(
                "Completed: {} documents, {} projects found ({} ms)",
                self.document_count, self.project_count, self.duration_ms
            )
        }
    }
}

/// Drives a jurisdiction through the full pipeline.
pub struct ScrapeOrchestrator {
    catalog: Arc<JurisdictionCatalog>,
    launcher: Arc<dyn BrowserLauncher>,
    interactive_launcher: Option<Arc<dyn BrowserLauncher>>,
    crawler: DocumentCrawler,
    oracle: ExtractionOracle,
    reconciler: Reconciler,
    store: Arc<dyn ProjectStore>,
    objects: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ScrapeOrchestrator {
    pub fn new(
        catalog: Arc<JurisdictionCatalog>,
        launcher: Arc<dyn BrowserLauncher>,
        oracle: ExtractionOracle,
        store: Arc<dyn ProjectStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            catalog,
            launcher,
            interactive_launcher: None,
            crawler: DocumentCrawler::default(),
            oracle,
            reconciler: Reconciler::default(),
            store,
            objects,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    /// Launcher for sources that need script execution to render results.
    /// Without one, those sources fall back to the default launcher.
    pub fn with_interactive_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.interactive_launcher = Some(launcher);
        self
    }

    pub fn with_crawler_config(mut self, config: CrawlerConfig) -> Self {
        self.crawler = DocumentCrawler::new(config);
        self
    }

    pub fn with_reconcile_config(mut self, config: ReconcileConfig) -> Self {
        self.reconciler = Reconciler::new(config);
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn catalog(&self) -> &JurisdictionCatalog {
        &self.catalog
    }

    /// Run the pipeline for one jurisdiction.
    ///
    /// Fails only on run-fatal conditions: no catalog entry, no browsing
    /// session, an unreachable entry page, or a location that cannot be
    /// resolved. The browsing session is closed on every path once acquired.
    #[instrument(skip(self), fields(jurisdiction = %key))]
    pub async fn run(&self, key: &str, county: &str, state: &str) -> Result<RunResult> {
        let started = Instant::now();

        let source = self
            .catalog
            .get(key)
            .ok_or_else(|| ScrapeError::ConfigurationMissing {
                key: key.to_string(),
            })?;
        info!(county, state, source = %source.display_name, "Starting county scrape");

        let location_id = self.store.find_or_create_location(county, state).await?;

        let mut browser = self
            .launcher_for(source)
            .launch()
            .await
            .map_err(ScrapeError::BrowserLaunch)?;
        let crawled = self.crawler.crawl(browser.as_mut(), key, source).await;
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser session");
        }
        let documents = crawled?;

        if documents.is_empty() {
            warn!(county, state, "No documents found");
            return Ok(RunResult {
                document_count: 0,
                project_count: 0,
                duration_ms: elapsed_ms(started),
            });
        }
        info!(count = documents.len(), "Documents scraped");

        let storage = self.archive(&documents, county, state).await;

        let candidates = self.oracle.extract(&documents).await;
        let projects = self.reconciler.reconcile(candidates);
        info!(count = projects.len(), "Data center projects identified");

        self.persist(&location_id, &projects, &documents, &storage).await;

        let result = RunResult {
            document_count: documents.len(),
            project_count: projects.len(),
            duration_ms: elapsed_ms(started),
        };
        info!(county, state, duration_ms = result.duration_ms, "{}", result.summary());
        Ok(result)
    }

    fn launcher_for(&self, source: &JurisdictionSource) -> &dyn BrowserLauncher {
        match (&self.interactive_launcher, source.requires_interactive_rendering) {
            (Some(interactive), true) => interactive.as_ref(),
            (None, true) => {
                warn!(source = %source.display_name, "No rendering engine configured, crawling without scripts");
                self.launcher.as_ref()
            }
            (_, false) => self.launcher.as_ref(),
        }
    }

    /// [`Self::run`] with task-status bookkeeping.
    ///
    /// With a task id, the task moves to `running`, then to `success` with a
    /// summary line or to `error` with `"Failed: <message>"`. Status-update
    /// failures are logged and never change the run's outcome.
    pub async fn run_tracked(
        &self,
        county: &str,
        state: &str,
        task_id: Option<&str>,
    ) -> Result<RunResult> {
        let key = jurisdiction_key(county, state);
        self.set_status(task_id, TaskStatus::Running, "Starting scrape...")
            .await;

        match self.run(&key, county, state).await {
            Ok(result) => {
                self.set_status(task_id, TaskStatus::Success, &result.summary())
                    .await;
                Ok(result)
            }
            Err(e) => {
                error!(county, state, error = %e, "Scrape failed");
                self.set_status(task_id, TaskStatus::Error, &format!("Failed: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    async fn set_status(&self, task_id: Option<&str>, status: TaskStatus, log: &str) {
        let Some(task_id) = task_id else { return };
        if let Err(e) = self
            .store
            .update_task_status(task_id, status, Some(log))
            .await
        {
            warn!(task_id, status = %status, error = %e, "Failed to update task status");
        }
    }

    /// Upload every document; returns source URL -> storage locator for
    /// the uploads that succeeded.
    async fn archive(
        &self,
        documents: &[RawDocument],
        county: &str,
        state: &str,
    ) -> HashMap<String, String> {
        let date = Utc::now().date_naive();
        let mut storage = HashMap::new();

        for doc in documents {
            let key = document_key(state, county, date, doc);
            match self
                .objects
                .upload(&self.bucket, &key, doc.as_bytes(), doc.content_type())
                .await
            {
                Ok(locator) => {
                    storage.insert(doc.url.clone(), locator);
                }
                Err(e) => {
                    warn!(url = %doc.url, key = %key, error = %e, "Failed to upload document");
                }
            }
        }

        storage
    }

    async fn persist(
        &self,
        location_id: &str,
        projects: &[Project],
        documents: &[RawDocument],
        storage: &HashMap<String, String>,
    ) {
        for project in projects {
            let project_id = match self.store.save_project(location_id, project).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(project = project.label(), error = %e, "Failed to save project");
                    continue;
                }
            };

            let referenced: Vec<&RawDocument> = documents
                .iter()
                .filter(|doc| project.references(&doc.url))
                .collect();
            if let Err(e) = self
                .store
                .save_documents(&project_id, &referenced, storage)
                .await
            {
                warn!(project_id = %project_id, error = %e, "Failed to save project documents");
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
