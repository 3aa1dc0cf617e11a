//! Retrieved documents and their categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Well-known metadata keys attached by the crawler.
pub mod meta {
    pub const TITLE: &str = "title";
    pub const CONTENT_TYPE: &str = "content_type";
    pub const SIZE: &str = "size";
    pub const JURISDICTION: &str = "jurisdiction";
    pub const SEARCH_TERM: &str = "search_term";
}

/// Kind of government document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Permit,
    ZoningMinutes,
    UtilityFiling,
    PlanningDoc,
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::ZoningMinutes => "zoning_minutes",
            Self::UtilityFiling => "utility_filing",
            Self::PlanningDoc => "planning_doc",
            Self::Other => "other",
        }
    }
}

impl Default for DocumentCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permit" => Ok(Self::Permit),
            "zoning_minutes" => Ok(Self::ZoningMinutes),
            "utility_filing" => Ok(Self::UtilityFiling),
            "planning_doc" => Ok(Self::PlanningDoc),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown document category: {other}")),
        }
    }
}

/// Document body as retrieved.
///
/// Binary bodies are never decoded by the crawler; they are carried through
/// unchanged so object storage receives the original bytes.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentContent {
    /// Decoded page text
    Text(String),
    /// Undecoded binary body (PDF, Office formats)
    Binary(Vec<u8>),
}

impl fmt::Debug for DocumentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Binary(bytes) => f.debug_tuple("Binary").field(&bytes.len()).finish(),
        }
    }
}

/// One retrieved artifact.
///
/// Immutable after the crawler creates it; consumed once by extraction and
/// then handed to persistence.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Absolute source URL, unique within a crawl run
    pub url: String,
    pub category: DocumentCategory,
    pub content: DocumentContent,
    pub retrieved_at: DateTime<Utc>,
    /// Free-form metadata (title, content type, jurisdiction, search term)
    pub metadata: BTreeMap<String, String>,
}

impl RawDocument {
    /// Create a text document. Category defaults to `Other` until classified.
    pub fn text(url: Url, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: DocumentCategory::Other,
            content: DocumentContent::Text(content.into()),
            retrieved_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Create a binary document.
    pub fn binary(url: Url, bytes: Vec<u8>) -> Self {
        let size = bytes.len();
        Self {
            url: url.into(),
            category: DocumentCategory::Other,
            content: DocumentContent::Binary(bytes),
            retrieved_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
        .with_metadata(meta::SIZE, size.to_string())
    }

    pub fn with_category(mut self, category: DocumentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_retrieved_at(mut self, retrieved_at: DateTime<Utc>) -> Self {
        self.retrieved_at = retrieved_at;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get(meta::TITLE).map(String::as_str)
    }

    /// MIME type; page documents default to plain text.
    pub fn content_type(&self) -> &str {
        self.metadata
            .get(meta::CONTENT_TYPE)
            .map(String::as_str)
            .unwrap_or(match self.content {
                DocumentContent::Text(_) => "text/plain; charset=utf-8",
                DocumentContent::Binary(_) => "application/octet-stream",
            })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.content, DocumentContent::Binary(_))
    }

    /// Body length in bytes.
    pub fn byte_len(&self) -> usize {
        match &self.content {
            DocumentContent::Text(text) => text.len(),
            DocumentContent::Binary(bytes) => bytes.len(),
        }
    }

    /// Decoded text, if this is a page document.
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            DocumentContent::Text(text) => Some(text),
            DocumentContent::Binary(_) => None,
        }
    }

    /// Body as bytes, exactly as it will be archived.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.content {
            DocumentContent::Text(text) => text.as_bytes(),
            DocumentContent::Binary(bytes) => bytes,
        }
    }

    /// File extension used when archiving: the URL's extension for binaries,
    /// `txt` for page text.
    pub fn archive_extension(&self) -> String {
        match self.content {
            DocumentContent::Text(_) => "txt".to_string(),
            DocumentContent::Binary(_) => Url::parse(&self.url)
                .ok()
                .and_then(|u| url_extension(&u))
                .unwrap_or_else(|| "bin".to_string()),
        }
    }
}

/// Lower-cased extension of the URL path's last segment, if any.
pub fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
