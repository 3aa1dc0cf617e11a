//! Language-model completion boundary.
//!
//! The extraction oracle only ever sees `request -> raw text`. Parsing and
//! schema validation happen in [`crate::oracle`], so they can be tested
//! without a live service.

use async_trait::async_trait;

use crate::error::ExtractionError;

/// One extraction request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fixed instruction text (system prompt)
    pub instructions: String,
    /// Per-document prompt carrying the excerpt
    pub prompt: String,
    /// Source document, for logging and test routing
    pub document_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text-completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Return the model's free-form reply.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), ExtractionError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "unknown"
    }
}
