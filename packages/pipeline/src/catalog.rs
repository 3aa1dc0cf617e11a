//! Static per-jurisdiction crawl parameters.
//!
//! The catalog is loaded once at process start and never mutated while
//! runs are in flight. Keys are normalized `"<county>-<state>"` slugs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

use crate::error::CatalogError;

/// Search terms used when a source does not list its own.
pub const DEFAULT_SEARCH_TERMS: [&str; 4] = ["data center", "datacenter", "server farm", "colocation"];

fn default_search_terms() -> Vec<String> {
    DEFAULT_SEARCH_TERMS.iter().map(|t| t.to_string()).collect()
}

fn default_true() -> bool {
    true
}

/// Crawl parameters for one jurisdiction's public website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionSource {
    pub display_name: String,

    /// Site root, also the crawl's entry page
    pub base_url: String,

    /// Path appended to `base_url`, followed directly by the url-encoded term
    #[serde(default)]
    pub search_endpoint: Option<String>,

    /// CSS selector matching document links on result pages
    pub document_link_pattern: String,

    /// Whether the site needs script execution to render results
    #[serde(default = "default_true")]
    pub requires_interactive_rendering: bool,

    /// Ordered, non-empty
    #[serde(default = "default_search_terms")]
    pub search_terms: Vec<String>,
}

impl JurisdictionSource {
    pub fn new(
        display_name: impl Into<String>,
        base_url: impl Into<String>,
        document_link_pattern: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            base_url: base_url.into(),
            search_endpoint: None,
            document_link_pattern: document_link_pattern.into(),
            requires_interactive_rendering: true,
            search_terms: default_search_terms(),
        }
    }

    pub fn with_search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_search_terms(mut self, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.search_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_interactive_rendering(mut self, required: bool) -> Self {
        self.requires_interactive_rendering = required;
        self
    }

    /// Direct results URL for `term`, when the site has a search endpoint.
    pub fn search_url(&self, term: &str) -> Option<String> {
        self.search_endpoint.as_ref().map(|endpoint| {
            format!(
                "{}{}{}",
                self.base_url.trim_end_matches('/'),
                endpoint,
                urlencoding::encode(term)
            )
        })
    }

    /// Check the invariants every source must satisfy.
    pub fn validate(&self, key: &str) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidSource {
            key: key.to_string(),
            reason,
        };

        let base = Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("baseUrl {:?} is not absolute: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }
        if self.search_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(invalid("searchTerms must not be empty".to_string()));
        }
        scraper::Selector::parse(&self.document_link_pattern).map_err(|e| {
            invalid(format!(
                "documentLinkPattern {:?} is not a valid selector: {e:?}",
                self.document_link_pattern
            ))
        })?;
        Ok(())
    }
}

/// Normalized catalog key: lower-cased, whitespace runs collapsed to `-`.
pub fn jurisdiction_key(county: &str, state: &str) -> String {
    let county = county.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}-{}", county, state.trim()).to_lowercase()
}

/// All configured jurisdictions, keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct JurisdictionCatalog {
    sources: BTreeMap<String, JurisdictionSource>,
}

impl JurisdictionCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The jurisdictions shipped with the scraper.
    pub fn builtin() -> Self {
        let entries = [
            (
                "loudoun-va",
                JurisdictionSource::new(
                    "Loudoun County, VA",
                    "https://www.loudoun.gov",
                    r#"a[href*=".pdf"], a[href*="/documents/"]"#,
                )
                .with_search_endpoint("/search?q=")
                .with_search_terms(["data center", "server farm", "colocation facility"]),
            ),
            (
                "fairfax-va",
                JurisdictionSource::new(
                    "Fairfax County, VA",
                    "https://www.fairfaxcounty.gov",
                    r#".search-result a, a[href*=".pdf"]"#,
                )
                .with_search_endpoint("/search/site/")
                .with_search_terms(["data center", "technology facility", "server farm"]),
            ),
            (
                "prince-william-va",
                JurisdictionSource::new(
                    "Prince William County, VA",
                    "https://www.pwcva.gov",
                    r#"a[href*=".pdf"], .document-link"#,
                )
                .with_search_terms(["data center", "digital infrastructure"]),
            ),
            (
                "douglas-ga",
                JurisdictionSource::new(
                    "Douglas County, GA",
                    "https://www.douglascountyga.gov",
                    r#"a[href*=".pdf"], .minutes-link"#,
                )
                .with_search_terms(["data center", "technology park"]),
            ),
            (
                "mesa-az",
                JurisdictionSource::new(
                    "Mesa, AZ",
                    "https://www.mesaaz.gov",
                    r#".search-result-link, a[href*=".pdf"]"#,
                )
                .with_search_endpoint("/Home/Search?searchPhrase=")
                .with_search_terms(["data center", "server facility"]),
            ),
            (
                "chandler-az",
                JurisdictionSource::new(
                    "Chandler, AZ",
                    "https://www.chandleraz.gov",
                    r#"a[href*=".pdf"], .document-link"#,
                )
                .with_search_terms(["data center", "technology campus"]),
            ),
            (
                "phoenix-az",
                JurisdictionSource::new(
                    "Phoenix, AZ",
                    "https://www.phoenix.gov",
                    r#".search-result a, a[href*=".pdf"]"#,
                )
                .with_search_endpoint("/search?q=")
                .with_search_terms(["data center", "colocation"]),
            ),
            (
                "columbus-oh",
                JurisdictionSource::new(
                    "Columbus, OH",
                    "https://www.columbus.gov",
                    r#"a[href*=".pdf"], .doc-link"#,
                )
                .with_search_terms(["data center", "server farm", "technology facility"]),
            ),
            (
                "des-moines-ia",
                JurisdictionSource::new(
                    "Des Moines, IA",
                    "https://www.dsm.city",
                    r#"a[href*=".pdf"], .agenda-link"#,
                )
                .with_search_terms(["data center", "technology hub"]),
            ),
            (
                "quincy-wa",
                JurisdictionSource::new(
                    "Quincy, WA",
                    "https://www.quincywa.gov",
                    r#"a[href*=".pdf"], .document-link"#,
                )
                .with_search_terms(["data center", "server facility", "cloud computing"]),
            ),
        ];

        Self {
            sources: entries
                .into_iter()
                .map(|(key, source)| (key.to_string(), source))
                .collect(),
        }
    }

    /// Parse a JSON object of `key -> source`, validating every entry.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, JurisdictionSource> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (key, source) in raw {
            catalog.insert(&key, source)?;
        }
        Ok(catalog)
    }

    /// Load a JSON catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add or replace a source after validating it.
    pub fn insert(&mut self, key: &str, source: JurisdictionSource) -> Result<(), CatalogError> {
        let key = key.trim().to_lowercase();
        source.validate(&key)?;
        self.sources.insert(key, source);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&JurisdictionSource> {
        self.sources.get(&key.trim().to_lowercase())
    }

    /// Sorted keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JurisdictionSource)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
