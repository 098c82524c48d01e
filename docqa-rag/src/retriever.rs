//! Query embedding and top-K retrieval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::{EmbeddingService, embed_with_timeout};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds questions and ranks indexed chunks against them.
///
/// The retriever is bound to one embedding model and refuses to search an
/// index built with a different one, since vectors from two models are not
/// comparable.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingService>,
    model: String,
    timeout: Duration,
}

impl Retriever {
    /// Create a retriever that embeds queries with `model`.
    pub fn new(embedder: Arc<dyn EmbeddingService>, model: impl Into<String>) -> Self {
        Self { embedder, model: model.into(), timeout: Duration::from_secs(120) }
    }

    /// Set the timeout applied to the query embedding call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The embedding model queries are embedded with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Return up to `k` chunks from `index`, most similar to `query` first.
    ///
    /// Asking for more chunks than the index holds is not an error; every
    /// chunk is returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfig`] if `k == 0`.
    /// - [`RagError::ModelMismatch`] if the index was built with another model.
    /// - [`RagError::EmbeddingService`] / [`RagError::Timeout`] from the query
    ///   embedding, including a vector whose length differs from the index.
    pub async fn retrieve(&self, index: &VectorIndex, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidConfig("k must be at least 1".to_string()));
        }
        if index.embedding_model() != self.model {
            error!(index_model = index.embedding_model(), query_model = %self.model, "embedding model mismatch");
            return Err(RagError::ModelMismatch {
                index_model: index.embedding_model().to_string(),
                query_model: self.model.clone(),
            });
        }

        let dimensions = index.dimensions().await;
        let query_embedding =
            embed_with_timeout(self.embedder.as_ref(), &[query], &self.model, dimensions, self.timeout)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| RagError::embedding(&self.model, "service returned no vector for the query"))?;

        let results = index.search(&query_embedding, k).await?;
        debug!(k, result_count = results.len(), "retrieved chunks");
        Ok(results)
    }
}
