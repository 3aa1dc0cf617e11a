//! Testing utilities including mock implementations.
//!
//! These let applications and tests drive the whole pipeline without a
//! network or a live language model.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{CrawlError, CrawlResult, ExtractionError};
use crate::traits::browser::{Browser, BrowserLauncher};
use crate::traits::completion::{CompletionRequest, CompletionService};

/// A scripted page.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: Option<String>,
    pub text: String,
    /// Returned by `find_links` for any selector
    pub links: Vec<String>,
    /// Selectors that match a search input on this page
    pub search_inputs: Vec<String>,
}

impl MockPage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_links(mut self, links: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_search_input(mut self, selector: impl Into<String>) -> Self {
        self.search_inputs.push(selector.into());
        self
    }
}

/// Record of a call made to the mock browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBrowserCall {
    Navigate { url: String },
    FindLinks { selector: String },
    ExtractText { selector: String },
    PageText,
    WaitForSelector { selector: String },
    SubmitSearch { selector: String, term: String },
    FetchBinary { url: String },
    Close,
}

/// A scripted browsing session.
///
/// Clones share pages, call history and the closed flag, so a test can keep
/// a handle while the pipeline owns the session.
#[derive(Clone, Default)]
pub struct MockBrowser {
    pages: Arc<RwLock<HashMap<String, MockPage>>>,
    binaries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// Search term -> results page URL for on-page search
    search_results: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<MockBrowserCall>>>,
    closed: Arc<AtomicBool>,
    current: Option<String>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at `url`.
    pub fn with_page(self, url: impl Into<String>, page: MockPage) -> Self {
        self.pages.write().unwrap().insert(url.into(), page);
        self
    }

    /// Serve `bytes` for a binary fetch of `url`.
    pub fn with_binary(self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.binaries.write().unwrap().insert(url.into(), bytes);
        self
    }

    /// Where an on-page search for `term` lands.
    pub fn with_search_results(self, term: impl Into<String>, results_url: impl Into<String>) -> Self {
        self.search_results
            .write()
            .unwrap()
            .insert(term.into(), results_url.into());
        self
    }

    /// Make navigation to, or a binary fetch of, `url` fail.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(url.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockBrowserCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockBrowserCall::Navigate { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Total number of calls of any kind.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: MockBrowserCall) {
        self.calls.write().unwrap().push(call);
    }

    fn current_page(&self) -> CrawlResult<MockPage> {
        if self.is_closed() {
            return Err(CrawlError::Session("session closed".into()));
        }
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| CrawlError::Session("no page loaded".into()))?;
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Session(format!("page vanished: {url}")))
    }

    fn load(&mut self, url: &str) -> CrawlResult<()> {
        if self.is_closed() {
            return Err(CrawlError::Session("session closed".into()));
        }
        if self.failing.read().unwrap().contains(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "injected failure".into(),
            });
        }
        if !self.pages.read().unwrap().contains_key(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> CrawlResult<()> {
        self.record(MockBrowserCall::Navigate { url: url.to_string() });
        self.load(url)
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    async fn find_links(&self, selector: &str) -> CrawlResult<Vec<String>> {
        self.record(MockBrowserCall::FindLinks {
            selector: selector.to_string(),
        });
        Ok(self.current_page()?.links)
    }

    async fn extract_text(&self, selector: &str) -> CrawlResult<Option<String>> {
        self.record(MockBrowserCall::ExtractText {
            selector: selector.to_string(),
        });
        let page = self.current_page()?;
        Ok(if selector == "title" { page.title } else { None })
    }

    async fn page_text(&self) -> CrawlResult<String> {
        self.record(MockBrowserCall::PageText);
        Ok(self.current_page()?.text)
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> CrawlResult<bool> {
        self.record(MockBrowserCall::WaitForSelector {
            selector: selector.to_string(),
        });
        let page = self.current_page()?;
        Ok(page.search_inputs.iter().any(|s| s == selector))
    }

    async fn submit_search(
        &mut self,
        selector: &str,
        term: &str,
        _timeout: Duration,
    ) -> CrawlResult<()> {
        self.record(MockBrowserCall::SubmitSearch {
            selector: selector.to_string(),
            term: term.to_string(),
        });

        let page = self.current_page()?;
        if !page.search_inputs.iter().any(|s| s == selector) {
            return Err(CrawlError::SearchUnavailable {
                selector: selector.to_string(),
            });
        }

        let results = self.search_results.read().unwrap().get(term).cloned();
        match results {
            Some(url) => self.load(&url),
            None => Err(CrawlError::Navigation {
                url: format!("search:{term}"),
                reason: "no scripted results".into(),
            }),
        }
    }

    async fn fetch_binary(&self, url: &str, _timeout: Duration) -> CrawlResult<Vec<u8>> {
        self.record(MockBrowserCall::FetchBinary { url: url.to_string() });
        if self.is_closed() {
            return Err(CrawlError::Session("session closed".into()));
        }
        if self.failing.read().unwrap().contains(url) {
            return Err(CrawlError::Timeout { url: url.to_string() });
        }
        self.binaries
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| CrawlError::Navigation {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            })
    }

    async fn close(&mut self) -> CrawlResult<()> {
        self.record(MockBrowserCall::Close);
        self.closed.store(true, Ordering::SeqCst);
        self.current = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Hands out clones of one [`MockBrowser`].
#[derive(Clone, Default)]
pub struct MockBrowserLauncher {
    browser: MockBrowser,
    launches: Arc<AtomicUsize>,
    fail: bool,
}

impl MockBrowserLauncher {
    pub fn new(browser: MockBrowser) -> Self {
        Self {
            browser,
            launches: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Handle onto the sessions this launcher hands out.
    pub fn browser(&self) -> &MockBrowser {
        &self.browser
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowserLauncher {
    async fn launch(&self) -> CrawlResult<Box<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CrawlError::Session("injected launch failure".into()));
        }
        // Each launch is a fresh session over the same scripted site.
        self.browser.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(self.browser.clone()))
    }
}

/// A mock completion service for testing.
///
/// Replies are looked up by document URL. Unknown URLs get a reply with no
/// fenced block, which the oracle treats as "no project".
#[derive(Clone)]
pub struct MockCompletion {
    replies: Arc<RwLock<HashMap<String, String>>>,
    failures: Arc<RwLock<HashSet<String>>>,
    default_reply: String,
    ping_fails: bool,
    calls: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self {
            replies: Arc::default(),
            failures: Arc::default(),
            default_reply: "No data center project is mentioned in this document.".to_string(),
            ping_fails: false,
            calls: Arc::default(),
        }
    }
}

impl MockCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` for the document at `url`.
    pub fn with_reply(self, url: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.write().unwrap().insert(url.into(), reply.into());
        self
    }

    /// Fail the request for the document at `url`.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// Reply for documents with no scripted reply.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn with_failing_ping(mut self) -> Self {
        self.ping_fails = true;
        self
    }

    /// Get all requests made to this mock.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError> {
        self.calls.write().unwrap().push(request.clone());

        if self.failures.read().unwrap().contains(&request.document_url) {
            return Err(ExtractionError::Service("injected completion failure".into()));
        }

        Ok(self
            .replies
            .read()
            .unwrap()
            .get(&request.document_url)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone()))
    }

    async fn ping(&self) -> Result<(), ExtractionError> {
        if self.ping_fails {
            return Err(ExtractionError::Service("injected ping failure".into()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_browser_serves_scripted_pages() {
        let mut browser = MockBrowser::new()
            .with_page("https://a.gov", MockPage::new("home").with_links(["https://a.gov/1"]));
        let handle = browser.clone();

        browser.navigate("https://a.gov", Duration::from_secs(1)).await.unwrap();
        assert_eq!(browser.current_url(), Some("https://a.gov"));
        assert_eq!(browser.find_links("a").await.unwrap(), vec!["https://a.gov/1".to_string()]);
        assert!(browser.navigate("https://a.gov/missing", Duration::from_secs(1)).await.is_err());

        browser.close().await.unwrap();
        assert!(handle.is_closed());
        assert_eq!(handle.call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_completion_routes_by_url() {
        let mock = MockCompletion::new().with_reply("u1", "hello").with_failure("u2");
        let request = |url: &str| CompletionRequest {
            instructions: String::new(),
            prompt: String::new(),
            document_url: url.to_string(),
            max_tokens: 10,
            temperature: 0.0,
        };

        assert_eq!(mock.complete(&request("u1")).await.unwrap(), "hello");
        assert!(mock.complete(&request("u2")).await.is_err());
        assert!(mock.complete(&request("u3")).await.unwrap().starts_with("No data center"));
        assert_eq!(mock.call_count(), 3);
    }
}
