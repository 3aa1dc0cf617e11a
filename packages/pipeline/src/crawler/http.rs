//! Plain-HTTP browsing session.
//!
//! Fetches pages with reqwest and queries them with scraper. No script
//! execution, so sites that render results client-side yield no links.
//! On-page search works by submitting the input's enclosing form.
//!
//! `scraper::Html` is not `Send`; every parse happens inside a synchronous
//! helper so no parsed document lives across an await.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{CrawlError, CrawlResult};
use crate::traits::browser::{Browser, BrowserLauncher};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

pub(super) fn build_client() -> CrawlResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| CrawlError::Http(Box::new(e)))
}

struct Page {
    url: Url,
    html: String,
}

/// Browsing session over plain HTTP.
pub struct HttpBrowser {
    client: reqwest::Client,
    page: Option<Page>,
    closed: bool,
}

impl HttpBrowser {
    pub fn new() -> CrawlResult<Self> {
        Ok(Self::with_client(build_client()?))
    }

    /// Use a preconfigured client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            page: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> CrawlResult<()> {
        if self.closed {
            return Err(CrawlError::Session("session closed".to_string()));
        }
        Ok(())
    }

    fn page(&self) -> CrawlResult<&Page> {
        self.ensure_open()?;
        self.page
            .as_ref()
            .ok_or_else(|| CrawlError::Session("no page loaded".to_string()))
    }

    /// Send a request and read the body as text, bounded by `timeout`.
    async fn load(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        timeout: Duration,
    ) -> CrawlResult<Page> {
        let fetch = async {
            let response = request.send().await.map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(CrawlError::Navigation {
                    url: url.to_string(),
                    reason: format!("HTTP {status}"),
                });
            }

            let final_url = response.url().clone();
            let html = response
                .text()
                .await
                .map_err(|e| CrawlError::Http(Box::new(e)))?;

            Ok(Page {
                url: final_url,
                html,
            })
        };

        tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
            })?
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> CrawlResult<()> {
        self.ensure_open()?;
        let target = Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %target, "Navigating");
        let page = self.load(self.client.get(target), url, timeout).await?;
        self.page = Some(page);
        Ok(())
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.url.as_str())
    }

    async fn find_links(&self, selector: &str) -> CrawlResult<Vec<String>> {
        let page = self.page()?;
        links_matching(&page.html, &page.url, selector)
    }

    async fn extract_text(&self, selector: &str) -> CrawlResult<Option<String>> {
        let page = self.page()?;
        first_text(&page.html, selector)
    }

    async fn page_text(&self) -> CrawlResult<String> {
        let page = self.page()?;
        Ok(visible_text(&page.html))
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> CrawlResult<bool> {
        // A fetched page never changes, so the check is immediate.
        let page = self.page()?;
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&page.html);
        let found = document.select(&parsed).next().is_some();
        Ok(found)
    }

    async fn submit_search(
        &mut self,
        selector: &str,
        term: &str,
        timeout: Duration,
    ) -> CrawlResult<()> {
        let form = {
            let page = self.page()?;
            search_form(&page.html, &page.url, selector, term)?
        };

        debug!(action = %form.action, post = form.post, "Submitting search form");
        let action = form.action.to_string();
        let request = if form.post {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&form.fields)
                .finish();
            self.client
                .post(form.action)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
        } else {
            let mut target = form.action;
            target.query_pairs_mut().clear().extend_pairs(&form.fields);
            self.client.get(target)
        };

        let page = self.load(request, &action, timeout).await?;
        self.page = Some(page);
        Ok(())
    }

    async fn fetch_binary(&self, url: &str, timeout: Duration) -> CrawlResult<Vec<u8>> {
        self.ensure_open()?;
        download(&self.client, url, timeout).await
    }

    async fn close(&mut self) -> CrawlResult<()> {
        self.page = None;
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Hands out [`HttpBrowser`] sessions sharing one connection pool.
#[derive(Clone)]
pub struct HttpBrowserLauncher {
    client: reqwest::Client,
}

impl HttpBrowserLauncher {
    pub fn new() -> CrawlResult<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

#[async_trait]
impl BrowserLauncher for HttpBrowserLauncher {
    async fn launch(&self) -> CrawlResult<Box<dyn Browser>> {
        Ok(Box::new(HttpBrowser::with_client(self.client.clone())))
    }
}

/// Byte-level GET bounded by `timeout`.
pub(super) async fn download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> CrawlResult<Vec<u8>> {
    let target = Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
        url: url.to_string(),
    })?;

    let fetch = async {
        let response = client
            .get(target)
            .send()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CrawlError::Http(Box::new(e)))?;
        Ok(bytes.to_vec())
    };

    tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_| CrawlError::Timeout {
            url: url.to_string(),
        })?
}

pub(super) fn parse_selector(selector: &str) -> CrawlResult<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(super) fn first_text(html: &str, selector: &str) -> CrawlResult<Option<String>> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&parsed)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty()))
}

pub(super) fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || ["javascript:", "mailto:", "tel:"]
            .iter()
            .any(|p| lower.starts_with(p))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

pub(super) fn links_matching(html: &str, base: &Url, selector: &str) -> CrawlResult<Vec<String>> {
    let parsed = parse_selector(selector)?;
    let anchor = parse_selector("a[href]")?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&parsed) {
        let href = if element.value().name() == "a" {
            element.value().attr("href")
        } else {
            element
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
        };

        if let Some(link) = href.and_then(|h| resolve_link(base, h)) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    Ok(links)
}

#[derive(Debug)]
struct SearchForm {
    action: Url,
    post: bool,
    fields: Vec<(String, String)>,
}

fn enclosing_form(input: ElementRef<'_>) -> Option<ElementRef<'_>> {
    input
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form")
}

/// Resolve the request a browser would make when `term` is typed into the
/// input matching `selector` and submitted.
fn search_form(html: &str, base: &Url, selector: &str, term: &str) -> CrawlResult<SearchForm> {
    let parsed = parse_selector(selector)?;
    let fields_selector = parse_selector("input[name], select[name], textarea[name]")?;
    let document = Html::parse_document(html);

    let unavailable = || CrawlError::SearchUnavailable {
        selector: selector.to_string(),
    };

    let input = document.select(&parsed).next().ok_or_else(unavailable)?;
    let form = enclosing_form(input).ok_or_else(unavailable)?;
    let input_name = input.value().attr("name").unwrap_or("q").to_string();

    let action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => base.join(action).map_err(|_| CrawlError::InvalidUrl {
            url: action.to_string(),
        })?,
        _ => base.clone(),
    };
    let post = form
        .value()
        .attr("method")
        .map(|m| m.eq_ignore_ascii_case("post"))
        .unwrap_or(false);

    let mut fields = Vec::new();
    for field in form.select(&fields_selector) {
        let Some(name) = field.value().attr("name") else {
            continue;
        };
        if name == input_name {
            continue;
        }
        let kind = field.value().attr("type").unwrap_or("text").to_ascii_lowercase();
        if matches!(kind.as_str(), "submit" | "button" | "image" | "reset" | "file") {
            continue;
        }
        if matches!(kind.as_str(), "checkbox" | "radio") && field.value().attr("checked").is_none() {
            continue;
        }
        let value = field.value().attr("value").unwrap_or_default();
        fields.push((name.to_string(), value.to_string()));
    }
    fields.push((input_name, term.to_string()));

    Ok(SearchForm {
        action,
        post,
        fields,
    })
}
