//! Headless Chromium browsing session.
//!
//! Drives a real browser over CDP with chromiumoxide, so sites that build
//! their search results with scripts render before links are harvested.
//! Queries run against the rendered DOM snapshot using the same selector
//! helpers as [`super::HttpBrowser`]. Binary documents bypass the browser
//! and are downloaded with reqwest.
//!
//! Each launch starts its own browser process. `close` shuts it down; a
//! session dropped without `close` is torn down on a background task.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as Chrome, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use super::http::{build_client, download, first_text, links_matching, parse_selector, visible_text};
use crate::error::{CrawlError, CrawlResult};
use crate::traits::browser::{Browser, BrowserLauncher};

/// Poll interval while waiting for a selector to appear.
const SELECTOR_POLL: Duration = Duration::from_millis(100);

fn cdp_session(e: impl std::fmt::Display) -> CrawlError {
    CrawlError::Session(format!("chromium: {e}"))
}

/// Browsing session backed by one headless Chromium process.
pub struct ChromiumBrowser {
    browser: Option<Chrome>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    client: reqwest::Client,
    url: Option<String>,
}

impl ChromiumBrowser {
    fn page(&self) -> CrawlResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| CrawlError::Session("session closed".to_string()))
    }

    /// Rendered HTML of the current page and its URL.
    async fn snapshot(&self) -> CrawlResult<(String, Url)> {
        let page = self.page()?;
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| CrawlError::Session("no page loaded".to_string()))?;
        let base = Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
            url: url.to_string(),
        })?;
        let html = page.content().await.map_err(cdp_session)?;
        Ok((html, base))
    }

    /// Record where the page ended up after redirects or a form submit.
    async fn settle(&mut self, fallback: &str) -> CrawlResult<()> {
        let landed = self.page()?.url().await.map_err(cdp_session)?;
        self.url = Some(landed.unwrap_or_else(|| fallback.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> CrawlResult<()> {
        Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url, "Navigating");
        let page = self.page()?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.settle(url).await
    }

    fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    async fn find_links(&self, selector: &str) -> CrawlResult<Vec<String>> {
        let (html, base) = self.snapshot().await?;
        links_matching(&html, &base, selector)
    }

    async fn extract_text(&self, selector: &str) -> CrawlResult<Option<String>> {
        let (html, _) = self.snapshot().await?;
        first_text(&html, selector)
    }

    async fn page_text(&self) -> CrawlResult<String> {
        let (html, _) = self.snapshot().await?;
        Ok(visible_text(&html))
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> CrawlResult<bool> {
        parse_selector(selector)?;
        let page = self.page()?;

        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL).await;
            }
        };

        Ok(tokio::time::timeout(timeout, poll).await.is_ok())
    }

    async fn submit_search(
        &mut self,
        selector: &str,
        term: &str,
        timeout: Duration,
    ) -> CrawlResult<()> {
        let origin = self.url.clone().unwrap_or_default();
        let page = self.page()?;

        let input = page
            .find_element(selector)
            .await
            .map_err(|_| CrawlError::SearchUnavailable {
                selector: selector.to_string(),
            })?;
        input.click().await.map_err(cdp_session)?;
        input.type_str(term).await.map_err(cdp_session)?;
        input.press_key("Enter").await.map_err(cdp_session)?;

        tokio::time::timeout(timeout, page.wait_for_navigation())
            .await
            .map_err(|_| CrawlError::Timeout {
                url: origin.clone(),
            })?
            .map_err(|e| CrawlError::Navigation {
                url: origin.clone(),
                reason: e.to_string(),
            })?;

        self.settle(&origin).await
    }

    async fn fetch_binary(&self, url: &str, timeout: Duration) -> CrawlResult<Vec<u8>> {
        self.page()?;
        download(&self.client, url, timeout).await
    }

    async fn close(&mut self) -> CrawlResult<()> {
        self.url = None;
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                warn!(error = %e, "Failed to close page");
            }
        }

        let result = match self.browser.take() {
            Some(mut browser) => {
                let closed = browser.close().await.map(|_| ()).map_err(cdp_session);
                if let Err(e) = browser.wait().await {
                    warn!(error = %e, "Chromium process did not exit cleanly");
                }
                closed
            }
            None => Ok(()),
        };

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        let page = self.page.take();
        let handler = self.handler.take();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Chromium session dropped outside a runtime; process left to exit on its own");
            return;
        };
        runtime.spawn(async move {
            if let Some(page) = page {
                let _ = page.close().await;
            }
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Chromium drop cleanup failed");
            } else {
                trace!("Chromium drop cleanup succeeded");
            }
            let _ = browser.wait().await;
            if let Some(handler) = handler {
                handler.abort();
            }
        });
    }
}

/// Starts a headless Chromium per session.
#[derive(Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl ChromiumLauncher {
    pub fn new() -> CrawlResult<Self> {
        Ok(Self {
            executable: None,
            request_timeout: Duration::from_secs(30),
            client: build_client()?,
        })
    }

    /// Use a specific Chrome/Chromium binary instead of searching `PATH`.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Bound on each CDP request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn browser_config(&self) -> CrawlResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(self.request_timeout)
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(cdp_session)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> CrawlResult<Box<dyn Browser>> {
        let (browser, mut handler) = Chrome::launch(self.browser_config()?)
            .await
            .map_err(cdp_session)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumBrowser {
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            client: self.client.clone(),
            url: None,
        };

        let page = match session.browser.as_ref() {
            Some(browser) => browser.new_page("about:blank").await,
            None => return Err(CrawlError::Session("browser vanished".to_string())),
        };
        match page {
            Ok(page) => {
                session.page = Some(page);
                debug!("Chromium session ready");
                Ok(Box::new(session))
            }
            Err(e) => {
                let _ = session.close().await;
                Err(cdp_session(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_config_builds_without_browser() {
        let launcher = ChromiumLauncher::new()
            .unwrap()
            .with_executable("/usr/bin/chromium")
            .with_request_timeout(Duration::from_secs(5));
        assert!(launcher.browser_config().is_ok());
    }
}
