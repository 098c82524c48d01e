//! Embedding service trait for generating vector embeddings from text.

use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::error::{RagError, Result};

/// A service that turns text into embedding vectors using a named model.
///
/// Implementations wrap a specific backend (a local Ollama server, a test
/// double, ...) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingService::embed_batch) implementation calls
/// [`embed`](EmbeddingService::embed) sequentially; backends that support
/// native batching should override it. Either way the returned vectors must
/// be in input order.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingService;
///
/// let service = OllamaEmbeddingService::new("http://localhost:11434", timeout)?;
/// let vector = service.embed("hello world", "nomic-embed-text").await?;
/// ```
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in order.
    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text, model).await?);
        }
        Ok(results)
    }
}

/// Embed `texts` through `service` under `timeout`, checking the reply shape.
///
/// The whole batch is one call: it either completes within `timeout` or the
/// batch fails with [`RagError::Timeout`]. Every vector must have the same
/// length, and that length must equal `dimensions` when it is known.
pub(crate) async fn embed_with_timeout(
    service: &dyn EmbeddingService,
    texts: &[&str],
    model: &str,
    dimensions: Option<usize>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let vectors = tokio::time::timeout(timeout, service.embed_batch(texts, model))
        .await
        .map_err(|_| {
            error!(model, batch_size = texts.len(), ?timeout, "embedding call timed out");
            RagError::timeout("embedding", timeout)
        })??;

    if vectors.len() != texts.len() {
        error!(model, expected = texts.len(), received = vectors.len(), "embedding count mismatch");
        return Err(RagError::embedding(
            model,
            format!("service returned {} vectors for {} inputs", vectors.len(), texts.len()),
        ));
    }
    if vectors.iter().any(Vec::is_empty) {
        return Err(RagError::embedding(model, "service returned an empty vector"));
    }
    let Some(expected) = dimensions.or_else(|| vectors.first().map(Vec::len)) else {
        return Ok(vectors);
    };
    if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
        error!(model, expected, received = bad.len(), "embedding dimension mismatch");
        return Err(RagError::embedding(
            model,
            format!("service returned a {}-dimensional vector, expected {expected}", bad.len()),
        ));
    }

    Ok(vectors)
}
