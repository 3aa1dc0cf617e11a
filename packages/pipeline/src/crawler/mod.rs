//! Per-jurisdiction document crawler.
//!
//! Drives one browsing session through a jurisdiction's site: runs each
//! search term in catalog order, harvests document links, retrieves each
//! document and classifies it.
//!
//! # Failure policy
//!
//! Only an unreachable entry page fails the crawl. A failing search term or
//! a failing link is logged and skipped, and the crawl returns whatever was
//! gathered.
//!
//! # Example
//!
//! ```rust,ignore
//! use dci_pipeline::crawler::{DocumentCrawler, HttpBrowser};
//!
//! let mut browser = HttpBrowser::new()?;
//! let crawler = DocumentCrawler::default();
//! let documents = crawler.crawl(&mut browser, "loudoun-va", &source).await?;
//! ```

#[cfg(feature = "chromium")]
mod chromium;
mod classify;
mod http;

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumBrowser, ChromiumLauncher};
pub use classify::{classify, title_from_url};
pub use http::{HttpBrowser, HttpBrowserLauncher};

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::JurisdictionSource;
use crate::error::{CrawlError, CrawlResult};
use crate::traits::browser::Browser;
use crate::types::{document::url_extension, meta, RawDocument};

/// On-page search inputs, tried in priority order.
pub const SEARCH_INPUT_SELECTORS: [&str; 4] = [
    r#"input[type="search"]"#,
    r#"input[name*="search"]"#,
    r#"input[id*="search"]"#,
    r#"input[placeholder*="search" i]"#,
];

/// Crawler limits and timeouts.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Bound on every page navigation and binary download
    pub navigation_timeout: Duration,
    /// Bound on each search-input lookup
    pub selector_timeout: Duration,
    /// Links retrieved per search term
    pub max_links_per_term: usize,
    /// Lower-case URL extensions fetched as undecoded bytes
    pub binary_extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            selector_timeout: Duration::from_secs(2),
            max_links_per_term: 10,
            binary_extensions: ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "rtf"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl CrawlerConfig {
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_selector_timeout(mut self, timeout: Duration) -> Self {
        self.selector_timeout = timeout;
        self
    }

    pub fn with_max_links_per_term(mut self, max: usize) -> Self {
        self.max_links_per_term = max;
        self
    }

    fn is_binary(&self, url: &Url) -> bool {
        url_extension(url)
            .map(|ext| self.binary_extensions.iter().any(|b| *b == ext))
            .unwrap_or(false)
    }
}

/// MIME type for a binary document extension.
fn binary_content_type(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}

/// Retrieves candidate documents for one jurisdiction.
#[derive(Debug, Clone, Default)]
pub struct DocumentCrawler {
    config: CrawlerConfig,
}

impl DocumentCrawler {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl a jurisdiction with the given session.
    ///
    /// Fails with [`CrawlError::EntryUnreachable`] only when the entry page
    /// cannot be loaded.
    pub async fn crawl(
        &self,
        browser: &mut dyn Browser,
        jurisdiction: &str,
        source: &JurisdictionSource,
    ) -> CrawlResult<Vec<RawDocument>> {
        info!(
            jurisdiction = %jurisdiction,
            url = %source.base_url,
            engine = browser.name(),
            interactive = source.requires_interactive_rendering,
            "Starting crawl"
        );

        browser
            .navigate(&source.base_url, self.config.navigation_timeout)
            .await
            .map_err(|e| CrawlError::EntryUnreachable {
                url: source.base_url.clone(),
                reason: e.to_string(),
            })?;

        let mut documents = Vec::new();
        let mut seen = HashSet::new();
        let mut on_entry_page = true;

        for term in source.search_terms.iter().filter(|t| !t.trim().is_empty()) {
            info!(jurisdiction = %jurisdiction, term = %term, "Searching for term");

            let result = self
                .crawl_term(browser, jurisdiction, source, term, on_entry_page, &mut seen)
                .await;
            on_entry_page = false;

            match result {
                Ok(found) => {
                    debug!(term = %term, count = found.len(), "Term complete");
                    documents.extend(found);
                }
                Err(e) => {
                    warn!(jurisdiction = %jurisdiction, term = %term, error = %e, "Search failed, skipping term");
                }
            }
        }

        info!(jurisdiction = %jurisdiction, count = documents.len(), "Crawl complete");
        Ok(documents)
    }

    /// Run one term and retrieve its links. Per-link failures are absorbed here.
    async fn crawl_term(
        &self,
        browser: &mut dyn Browser,
        jurisdiction: &str,
        source: &JurisdictionSource,
        term: &str,
        on_entry_page: bool,
        seen: &mut HashSet<String>,
    ) -> CrawlResult<Vec<RawDocument>> {
        if !self.run_search(browser, source, term, on_entry_page).await? {
            warn!(jurisdiction = %jurisdiction, term = %term, "No search box found, skipping term");
            return Ok(Vec::new());
        }

        let links = browser.find_links(&source.document_link_pattern).await?;
        info!(term = %term, count = links.len(), "Found document links");

        let mut documents = Vec::new();
        for link in links.into_iter().take(self.config.max_links_per_term) {
            if !seen.insert(link.clone()) {
                debug!(url = %link, "Already retrieved in this crawl");
                continue;
            }

            match self.retrieve(browser, jurisdiction, term, &link).await {
                Ok(doc) => {
                    info!(url = %link, category = %doc.category, bytes = doc.byte_len(), "Scraped document");
                    documents.push(doc);
                }
                Err(e) => {
                    warn!(url = %link, error = %e, "Failed to scrape document");
                }
            }
        }

        Ok(documents)
    }

    /// Put the session on the results page for `term`.
    ///
    /// Returns `false` when the site has no endpoint and no usable search input.
    async fn run_search(
        &self,
        browser: &mut dyn Browser,
        source: &JurisdictionSource,
        term: &str,
        on_entry_page: bool,
    ) -> CrawlResult<bool> {
        if let Some(search_url) = source.search_url(term) {
            browser
                .navigate(&search_url, self.config.navigation_timeout)
                .await?;
            return Ok(true);
        }

        if !on_entry_page {
            browser
                .navigate(&source.base_url, self.config.navigation_timeout)
                .await?;
        }

        for selector in SEARCH_INPUT_SELECTORS {
            match browser
                .wait_for_selector(selector, self.config.selector_timeout)
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!(selector, error = %e, "Search input lookup failed");
                    continue;
                }
            }

            match browser
                .submit_search(selector, term, self.config.navigation_timeout)
                .await
            {
                Ok(()) => return Ok(true),
                Err(e) => {
                    debug!(selector, error = %e, "Search submission failed, trying next input");
                }
            }
        }

        Ok(false)
    }

    /// Retrieve one link as a document.
    async fn retrieve(
        &self,
        browser: &mut dyn Browser,
        jurisdiction: &str,
        term: &str,
        link: &str,
    ) -> CrawlResult<RawDocument> {
        let url = Url::parse(link).map_err(|_| CrawlError::InvalidUrl {
            url: link.to_string(),
        })?;

        let doc = if self.config.is_binary(&url) {
            let bytes = browser
                .fetch_binary(link, self.config.navigation_timeout)
                .await?;
            let ext = url_extension(&url).unwrap_or_default();
            let title = title_from_url(&url);
            let category = classify(&title, "");

            RawDocument::binary(url, bytes)
                .with_category(category)
                .with_metadata(meta::TITLE, title)
                .with_metadata(meta::CONTENT_TYPE, binary_content_type(&ext))
        } else {
            browser.navigate(link, self.config.navigation_timeout).await?;
            let content = browser.page_text().await?;
            let title = browser
                .extract_text("title")
                .await?
                .unwrap_or_else(|| "Untitled".to_string());
            let category = classify(&title, &content);

            RawDocument::text(url, content)
                .with_category(category)
                .with_metadata(meta::TITLE, title)
                .with_metadata(meta::CONTENT_TYPE, "text/plain; charset=utf-8")
        };

        Ok(doc
            .with_metadata(meta::JURISDICTION, jurisdiction)
            .with_metadata(meta::SEARCH_TERM, term))
    }
}
