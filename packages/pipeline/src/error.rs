//! Typed errors for the scrape pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only [`ScrapeError`]
//! crosses the orchestrator boundary; crawler, extraction and store errors
//! below run level are logged and absorbed where they occur.

use thiserror::Error;

/// Errors that can occur while driving a browsing session.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The jurisdiction's entry page could not be reached at all (run-fatal)
    #[error("entry page unreachable: {url}: {reason}")]
    EntryUnreachable { url: String, reason: String },

    /// Navigation to a page failed
    #[error("navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait elapsed
    #[error("timeout loading: {url}")]
    Timeout { url: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// CSS selector failed to parse
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    /// No search input could be used on the current page
    #[error("no search input matched {selector:?}")]
    SearchUnavailable { selector: String },

    /// Operation attempted on a session that has no page loaded or was closed
    #[error("browser session not ready: {0}")]
    Session(String),
}

/// Errors that can occur while extracting a candidate from one document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The completion service failed or was unavailable
    #[error("extraction service error: {0}")]
    Service(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A structured payload was present but could not be parsed
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload parsed but failed the candidate schema
    #[error("validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },
}

/// Errors from persistence, queue and object-storage collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Errors raised while loading or validating the jurisdiction catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A source entry is unusable
    #[error("invalid jurisdiction {key}: {reason}")]
    InvalidSource { key: String, reason: String },

    /// Catalog file could not be parsed
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Catalog file could not be read
    #[error("catalog read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-fatal errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No catalog entry for the requested jurisdiction
    #[error("no configuration found for {key}")]
    ConfigurationMissing { key: String },

    /// The crawl could not start (entry page unreachable)
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    /// A browsing session could not be acquired
    #[error("browser launch failed: {0}")]
    BrowserLaunch(#[source] CrawlError),

    /// A collaborator failed in a way the run cannot absorb
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for orchestrator runs.
pub type Result<T> = std::result::Result<T, ScrapeError>;
