//! Document Q&A pipeline.
//!
//! The [`RagPipeline`] wires the loader, splitter, index builder, retriever
//! and orchestrator together under one [`RagConfig`]:
//!
//! - once per uploaded document: load → split → embed → index ([`RagPipeline::ingest`])
//! - once per question: embed → search → prompt → complete ([`RagPipeline::answer`])
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_service(Arc::new(embedder))
//!     .completion_service(Arc::new(llm))
//!     .build()?;
//!
//! let index = pipeline.ingest("notes.txt").await?;
//! let answer = pipeline.answer(&index, "What color is the sky?", 2).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::completion::CompletionService;
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, RawDocument, RetrievalResult};
use crate::embedding::EmbeddingService;
use crate::error::{LoadError, RagError, Result};
use crate::index::{IndexBuilder, VectorIndex};
use crate::loader::{self, attach_preview};
use crate::orchestrator::Orchestrator;
use crate::retriever::Retriever;
use crate::splitter::{RecursiveSplitter, Splitter};

/// The document Q&A pipeline. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    splitter: Arc<dyn Splitter>,
    index_builder: IndexBuilder,
    orchestrator: Orchestrator,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Load a file into a [`RawDocument`]. See [`loader::load`].
    pub fn load(&self, path: impl AsRef<Path>) -> Result<RawDocument> {
        loader::load(path)
    }

    /// Split a loaded document into chunks with the configured splitter.
    pub fn split(&self, document: &RawDocument) -> Vec<Chunk> {
        self.splitter.split(document)
    }

    /// Embed chunks into a fresh [`VectorIndex`].
    pub async fn build_index(&self, chunks: Vec<Chunk>) -> Result<VectorIndex> {
        self.index_builder.build(chunks).await
    }

    /// Embed additional chunks into an existing index.
    pub async fn extend_index(&self, index: &VectorIndex, chunks: Vec<Chunk>) -> Result<()> {
        self.index_builder.extend(index, chunks).await
    }

    /// Ingest a file: load → split → embed → index.
    ///
    /// # Errors
    ///
    /// - [`RagError::UnsupportedFormat`] / [`RagError::Load`] from the loader.
    /// - [`RagError::Load`] if the document yields no text to index.
    /// - Any [`IndexBuilder::build`] error.
    pub async fn ingest(&self, path: impl AsRef<Path>) -> Result<VectorIndex> {
        let path = path.as_ref();
        let document = self.load(path)?;

        let chunks = self.split(&document);
        if chunks.is_empty() {
            warn!(path = %path.display(), format = %document.format, "document has no text to index");
            let error = LoadError::new(path, document.format, "document contains no extractable text");
            return Err(RagError::Load(attach_preview(error)));
        }

        let chunk_count = chunks.len();
        let index = self.build_index(chunks).await?;
        info!(
            path = %path.display(),
            format = %document.format,
            record_count = document.records.len(),
            chunk_count,
            "ingested document"
        );
        Ok(index)
    }

    /// Return up to `k` chunks of `index` ranked against `query`.
    pub async fn retrieve(&self, index: &VectorIndex, query: &str, k: usize) -> Result<RetrievalResult> {
        self.orchestrator.retriever().retrieve(index, query, k).await
    }

    /// Answer `question` from the `k` most relevant chunks of `index`.
    pub async fn answer(&self, index: &VectorIndex, question: &str, k: usize) -> Result<Answer> {
        self.orchestrator.answer(index, question, k).await
    }

    /// Answer `question` using the configured `top_k`.
    pub async fn ask(&self, index: &VectorIndex, question: &str) -> Result<Answer> {
        self.answer(index, question, self.config.top_k).await
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// Both services are required. The configuration defaults to
/// [`RagConfig::default()`] and the splitter to a [`RecursiveSplitter`] sized
/// from the configuration.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_service: Option<Arc<dyn EmbeddingService>>,
    completion_service: Option<Arc<dyn CompletionService>>,
    splitter: Option<Arc<dyn Splitter>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding service.
    pub fn embedding_service(mut self, service: Arc<dyn EmbeddingService>) -> Self {
        self.embedding_service = Some(service);
        self
    }

    /// Set the completion service.
    pub fn completion_service(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.completion_service = Some(service);
        self
    }

    /// Replace the default splitter.
    pub fn splitter(mut self, splitter: Arc<dyn Splitter>) -> Self {
        self.splitter = Some(splitter);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if a service is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_service = self
            .embedding_service
            .ok_or_else(|| RagError::InvalidConfig("embedding_service is required".to_string()))?;
        let completion_service = self
            .completion_service
            .ok_or_else(|| RagError::InvalidConfig("completion_service is required".to_string()))?;
        let splitter: Arc<dyn Splitter> = match self.splitter {
            Some(splitter) => splitter,
            None => Arc::new(RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?),
        };

        let timeout = config.request_timeout();
        let index_builder = IndexBuilder::new(Arc::clone(&embedding_service), &config.embedding_model)
            .batch_size(config.embedding_batch_size)
            .timeout(timeout)
            .persist_dir(config.persist_dir.clone());
        let retriever = Retriever::new(embedding_service, &config.embedding_model).timeout(timeout);
        let orchestrator =
            Orchestrator::new(retriever, completion_service, &config.completion_model).timeout(timeout);

        Ok(RagPipeline { config, splitter, index_builder, orchestrator })
    }
}
