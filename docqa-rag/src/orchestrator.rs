//! Single-shot retrieval-augmented answering.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::completion::CompletionService;
use crate::document::{Answer, ScoredChunk};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// Join chunk contents into the context block, in ranked order.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks.iter().map(|c| c.chunk.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Build the prompt sent to the completion service.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}\nAnswer:")
}

/// Retrieves context for a question and asks the completion service once.
///
/// Stateless: nothing from one call is carried into the next.
#[derive(Clone)]
pub struct Orchestrator {
    retriever: Retriever,
    completion: Arc<dyn CompletionService>,
    model: String,
    timeout: Duration,
}

impl Orchestrator {
    /// Create an orchestrator that answers with `model` through `completion`.
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionService>,
        model: impl Into<String>,
    ) -> Self {
        Self { retriever, completion, model: model.into(), timeout: Duration::from_secs(120) }
    }

    /// Set the timeout applied to the completion call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The retriever used to gather context.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question` from the `k` most relevant chunks of `index`.
    ///
    /// Returns the completion verbatim together with the chunks used, so the
    /// caller can show where the answer came from.
    ///
    /// # Errors
    ///
    /// - Any [`Retriever::retrieve`] error.
    /// - [`RagError::Completion`] if the completion service fails.
    /// - [`RagError::Timeout`] if the completion call exceeds the timeout.
    pub async fn answer(&self, index: &VectorIndex, question: &str, k: usize) -> Result<Answer> {
        let used_chunks = self.retriever.retrieve(index, question, k).await?;

        let context = build_context(&used_chunks);
        let prompt = build_prompt(&context, question);

        let answer = tokio::time::timeout(self.timeout, self.completion.complete(&prompt, &self.model))
            .await
            .map_err(|_| {
                error!(model = %self.model, timeout = ?self.timeout, "completion call timed out");
                RagError::timeout("completion", self.timeout)
            })?
            .map_err(|e| {
                error!(model = %self.model, error = %e, "completion failed");
                match e {
                    RagError::Completion { .. } | RagError::Timeout { .. } => e,
                    other => RagError::completion(&self.model, other.to_string()),
                }
            })?;

        info!(model = %self.model, chunk_count = used_chunks.len(), answer_len = answer.len(), "answered question");

        Ok(Answer { answer, used_chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_has_fixed_shape() {
        assert_eq!(
            build_prompt("A\n\nB", "Why?"),
            "Context:\nA\n\nB\n\nQuestion: Why?\nAnswer:"
        );
    }

    #[test]
    fn empty_context_still_builds_prompt() {
        assert_eq!(build_context(&[]), "");
        assert_eq!(build_prompt("", "Q"), "Context:\n\n\nQuestion: Q\nAnswer:");
    }
}
