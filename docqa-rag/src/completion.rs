//! Completion service trait for single-shot text generation.

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion backend consumed as a black box.
///
/// One prompt in, the model's raw text out. No streaming, no conversation
/// state.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt` with the named model.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String>;
}
