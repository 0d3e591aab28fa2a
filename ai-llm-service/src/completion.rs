//! The single contract every backend implements.

use async_trait::async_trait;

use crate::{config::llm_provider::LlmProvider, error_handler::AiLlmError};

/// A text-completion backend: one prompt in, one text out.
///
/// Implementations own their transport details; callers only see prompt
/// text and response text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Backend identity, used for logging and error attribution.
    fn provider(&self) -> LlmProvider;

    /// Sends `prompt` as a single user turn and returns the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, AiLlmError>;
}
