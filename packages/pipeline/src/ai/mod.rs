//! Completion service implementations.
//!
//! Reference implementations of the [`crate::traits::completion::CompletionService`]
//! trait. Tests use [`crate::testing::MockCompletion`] instead.

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicCompletion, DEFAULT_MODEL, PING_MODEL};
