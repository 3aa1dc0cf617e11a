//! Data Center Project Pipeline
//!
//! Crawls county and city government websites for documents that mention
//! data-center development, asks a language model to pull a structured
//! project record out of each document, reconciles the per-document records
//! into deduplicated projects, and hands everything to durable storage.
//!
//! # Design
//!
//! - The language model is an untrusted annotator: every reply is parsed
//!   and schema-checked, and anything invalid is dropped
//! - One document's failure never affects another
//! - Only run-fatal conditions surface as errors; everything else is logged
//! - Rendering, the model, storage and the queue sit behind traits
//!
//! # Usage
//!
//! ```rust,ignore
//! use dci_pipeline::{ExtractionOracle, JurisdictionCatalog, ScrapeOrchestrator};
//! use dci_pipeline::crawler::HttpBrowserLauncher;
//! use dci_pipeline::stores::MemoryStore;
//! use dci_pipeline::testing::MockCompletion;
//!
//! let store = Arc::new(MemoryStore::new());
//! let orchestrator = ScrapeOrchestrator::new(
//!     Arc::new(JurisdictionCatalog::builtin()),
//!     Arc::new(HttpBrowserLauncher::new()?),
//!     ExtractionOracle::new(Arc::new(MockCompletion::new())),
//!     store.clone(),
//!     store.clone(),
//! );
//!
//! let result = orchestrator.run("loudoun-va", "Loudoun", "VA").await?;
//! println!("{}", result.summary());
//! ```
//!
//! # Modules
//!
//! - [`catalog`] - Per-jurisdiction crawl parameters
//! - [`crawler`] - Document retrieval over a browsing session
//! - [`oracle`] - LLM extraction with reply parsing and validation
//! - [`reconcile`] - Merging candidates into projects
//! - [`orchestrator`] - One jurisdiction's end-to-end run
//! - [`worker`] - Queue consumer
//! - [`stores`] - Storage implementations (MemoryStore, filesystem, Postgres)
//! - [`testing`] - Mock implementations for testing

pub mod catalog;
pub mod crawler;
pub mod error;
pub mod oracle;
pub mod orchestrator;
pub mod reconcile;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod worker;

#[cfg(feature = "anthropic")]
pub mod ai;

// Re-export core types at crate root
pub use catalog::{jurisdiction_key, JurisdictionCatalog, JurisdictionSource};
pub use crawler::{CrawlerConfig, DocumentCrawler};
pub use error::{CatalogError, CrawlError, ExtractionError, ScrapeError, StoreError};
pub use oracle::{ExtractionOracle, OracleConfig};
pub use orchestrator::{RunResult, ScrapeOrchestrator};
pub use reconcile::{ReconcileConfig, Reconciler};
pub use traits::{
    browser::{Browser, BrowserLauncher},
    completion::{CompletionRequest, CompletionService},
    store::{ObjectStore, ProjectStore, TaskQueue},
};
pub use types::{
    CandidateProject, DocumentCategory, Project, ProjectStatus, RawDocument, ReceivedTask,
    ScrapeTask, TaskStatus,
};
pub use worker::{TaskWorker, WorkerConfig, WorkerState, WorkerStats};
