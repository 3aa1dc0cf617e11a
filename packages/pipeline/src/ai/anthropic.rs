//! Anthropic implementation of the completion boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use dci_pipeline::ai::AnthropicCompletion;
//!
//! let service = AnthropicCompletion::from_env()?.with_model("claude-3-opus-20240229");
//! let oracle = ExtractionOracle::new(Arc::new(service));
//! ```

use anthropic_client::{AnthropicClient, AnthropicError, Message, MessagesRequest};
use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractionError;
use crate::traits::completion::{CompletionRequest, CompletionService};

/// Default extraction model.
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";

/// Small model used for connectivity checks.
pub const PING_MODEL: &str = "claude-3-haiku-20240307";

impl From<AnthropicError> for ExtractionError {
    fn from(e: AnthropicError) -> Self {
        ExtractionError::Service(Box::new(e))
    }
}

/// Completion service backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicCompletion {
    client: AnthropicClient,
    model: String,
}

impl AnthropicCompletion {
    pub fn new(client: AnthropicClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, ExtractionError> {
        Ok(Self::new(AnthropicClient::from_env()?))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for AnthropicCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExtractionError> {
        let messages_request = MessagesRequest::new(&self.model)
            .system(&request.instructions)
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .message(Message::user(&request.prompt));

        let response = self.client.messages(messages_request).await?;
        let text = response.text();

        debug!(
            url = %request.document_url,
            model = %self.model,
            output_tokens = response.usage.map(|u| u.output_tokens).unwrap_or_default(),
            "Extraction reply received"
        );
        Ok(text)
    }

    async fn ping(&self) -> Result<(), ExtractionError> {
        let request = MessagesRequest::new(PING_MODEL)
            .max_tokens(10)
            .message(Message::user("test"));
        self.client.messages(request).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
