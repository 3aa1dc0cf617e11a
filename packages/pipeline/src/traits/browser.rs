//! Browser capability used by the document crawler.
//!
//! The crawl algorithm only needs a handful of page operations, so the
//! rendering engine stays swappable: [`crate::crawler::HttpBrowser`] for
//! static sites, `ChromiumBrowser` (feature `chromium`) for sites that
//! render results with scripts, [`crate::testing::MockBrowser`] for tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut browser = launcher.launch().await?;
//! browser.navigate("https://www.loudoun.gov", Duration::from_secs(30)).await?;
//! let links = browser.find_links("a[href*=\".pdf\"]").await?;
//! browser.close().await?;
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CrawlResult;

/// One exclusively-owned browsing session.
///
/// A session holds a single "current page". Navigation methods take
/// `&mut self`; a session is never shared between concurrent runs.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load `url` as the current page, waiting at most `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> CrawlResult<()>;

    /// URL of the current page after redirects, if one is loaded.
    fn current_url(&self) -> Option<&str>;

    /// Absolute `href`s of elements matching a CSS selector on the current
    /// page, in document order with duplicates removed.
    ///
    /// A matched element that is not itself a link contributes the first
    /// link nested inside it.
    async fn find_links(&self, selector: &str) -> CrawlResult<Vec<String>>;

    /// Trimmed text of the first element matching `selector`.
    async fn extract_text(&self, selector: &str) -> CrawlResult<Option<String>>;

    /// Visible text content of the whole current page.
    async fn page_text(&self) -> CrawlResult<String>;

    /// Wait up to `timeout` for `selector` to match on the current page.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> CrawlResult<bool>;

    /// Type `term` into the input matching `selector`, submit it and wait
    /// (bounded by `timeout`) for the resulting page.
    async fn submit_search(&mut self, selector: &str, term: &str, timeout: Duration)
        -> CrawlResult<()>;

    /// Byte-level download that leaves the current page untouched.
    async fn fetch_binary(&self, url: &str, timeout: Duration) -> CrawlResult<Vec<u8>>;

    /// Release the session. Further calls may fail.
    async fn close(&mut self) -> CrawlResult<()>;

    /// Engine name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Acquires browsing sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> CrawlResult<Box<dyn Browser>>;
}
