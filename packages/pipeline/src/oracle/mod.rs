//! LLM-backed project extraction.
//!
//! The oracle is an untrusted annotator: every reply goes through
//! [`parse::parse_reply`] and [`parse::validate_candidate`], and anything
//! that fails either gate yields no candidate for that document. A failure
//! on one document never affects another.

pub mod parse;
pub mod prompts;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::traits::completion::{CompletionRequest, CompletionService};
use crate::types::{CandidateProject, RawDocument};

pub use parse::{fenced_block, parse_reply, validate_candidate, ReplyPayload};
pub use prompts::{excerpt, format_extract_prompt, EXTRACTION_INSTRUCTIONS};

/// Request shaping for extraction calls.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Characters of page text sent per document
    pub max_excerpt_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_excerpt_chars: 50_000,
            max_tokens: 4000,
            temperature: 0.0,
        }
    }
}

impl OracleConfig {
    pub fn with_max_excerpt_chars(mut self, chars: usize) -> Self {
        self.max_excerpt_chars = chars;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Turns raw documents into schema-valid candidate projects.
#[derive(Clone)]
pub struct ExtractionOracle {
    service: Arc<dyn CompletionService>,
    config: OracleConfig,
}

impl ExtractionOracle {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            config: OracleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OracleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn service(&self) -> &Arc<dyn CompletionService> {
        &self.service
    }

    /// Extract candidates from `docs`, one request per document, in order.
    ///
    /// Never fails; per-document failures are logged with the URL.
    pub async fn extract(&self, docs: &[RawDocument]) -> Vec<CandidateProject> {
        let mut candidates = Vec::new();

        for doc in docs {
            match self.extract_one(doc).await {
                Ok(Some(candidate)) => {
                    debug!(url = %doc.url, status = %candidate.status, "Extracted candidate");
                    candidates.push(candidate);
                }
                Ok(None) => {}
                Err(ExtractionError::Validation { errors }) => {
                    warn!(url = %doc.url, errors = ?errors, "Invalid parsed data, dropping candidate");
                }
                Err(ExtractionError::Malformed(e)) => {
                    warn!(url = %doc.url, error = %e, "Malformed JSON in extraction reply");
                }
                Err(e) => {
                    warn!(url = %doc.url, error = %e, "Extraction service failed for document");
                }
            }
        }

        info!(
            documents = docs.len(),
            candidates = candidates.len(),
            service = self.service.name(),
            "Extraction complete"
        );
        candidates
    }

    /// Extract from one document.
    ///
    /// `Ok(None)` means the reply carried no project: either no fenced block
    /// or an explicit `null`.
    pub async fn extract_one(
        &self,
        doc: &RawDocument,
    ) -> Result<Option<CandidateProject>, ExtractionError> {
        let excerpt = excerpt(doc, self.config.max_excerpt_chars);
        let request = CompletionRequest {
            instructions: EXTRACTION_INSTRUCTIONS.to_string(),
            prompt: format_extract_prompt(doc, &excerpt),
            document_url: doc.url.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let reply = self.service.complete(&request).await?;

        match parse_reply(&reply)? {
            ReplyPayload::Missing => {
                debug!(url = %doc.url, "No JSON block in extraction reply");
                Ok(None)
            }
            ReplyPayload::NoProject => {
                debug!(url = %doc.url, "No data center project in document");
                Ok(None)
            }
            ReplyPayload::Object(payload) => validate_candidate(&payload, &doc.url).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;
    use crate::types::ProjectStatus;
    use url::Url;

    fn page(url: &str, text: &str) -> RawDocument {
        RawDocument::text(Url::parse(url).unwrap(), text)
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_document() {
        let mock = MockCompletion::new()
            .with_reply(
                "https://a.gov/1",
                "```json\n{\"name\": \"Alpha DC\", \"status\": \"planned\"}\n```",
            )
            .with_reply("https://a.gov/2", "```json\n{\"name\": \"Beta\"}\n```")
            .with_failure("https://a.gov/3")
            .with_reply("https://a.gov/4", "```json\n{not json}\n```")
            .with_reply(
                "https://a.gov/5",
                "```json\n{\"status\": \"operational\", \"powerMw\": 30}\n```",
            );
        let oracle = ExtractionOracle::new(Arc::new(mock.clone()));

        let docs: Vec<_> = (1..=5)
            .map(|i| page(&format!("https://a.gov/{i}"), "text"))
            .collect();
        let candidates = oracle.extract(&docs).await;

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name.as_deref(), Some("Alpha DC"));
        assert_eq!(candidates[0].source_documents, vec!["https://a.gov/1".to_string()]);
        assert_eq!(candidates[1].status, ProjectStatus::Operational);
        assert_eq!(mock.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_null_payload_is_no_candidate() {
        let mock = MockCompletion::new().with_reply("https://a.gov/n", "```json\nnull\n```");
        let oracle = ExtractionOracle::new(Arc::new(mock));

        let result = oracle.extract_one(&page("https://a.gov/n", "agenda")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_request_is_bounded_and_deterministic() {
        let mock = MockCompletion::new();
        let oracle = ExtractionOracle::new(Arc::new(mock.clone()))
            .with_config(OracleConfig::default().with_max_excerpt_chars(10));

        let long = "x".repeat(100);
        oracle.extract(&[page("https://a.gov/long", &long)]).await;

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains(&"x".repeat(10)));
        assert!(!calls[0].prompt.contains(&"x".repeat(11)));
        assert_eq!(calls[0].temperature, 0.0);
        assert_eq!(calls[0].max_tokens, 4000);
        assert_eq!(calls[0].instructions, EXTRACTION_INSTRUCTIONS);
    }
}
