//! # docqa-rag
//!
//! Retrieval-augmented question answering over a single document.
//!
//! The crate turns an uploaded file into a searchable index of text chunks
//! and answers questions against it:
//!
//! 1. [`loader::load`] reads a `.txt`, `.csv`, `.pdf` or `.docx` file into a
//!    [`RawDocument`] of records.
//! 2. [`RecursiveSplitter`] cuts records into overlapping [`Chunk`]s.
//! 3. [`IndexBuilder`] embeds chunks through an [`EmbeddingService`] into a
//!    [`VectorIndex`].
//! 4. [`Retriever`] ranks chunks against a question.
//! 5. [`Orchestrator`] builds the prompt and calls a [`CompletionService`].
//!
//! [`RagPipeline`] wires all five together from a [`RagConfig`].
//!
//! ## Features
//!
//! - `ollama` (default): [`ollama::OllamaEmbeddingService`] and
//!   [`ollama::OllamaCompletionService`] for a local Ollama server.

pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod loader;
pub mod orchestrator;
pub mod pipeline;
pub mod retriever;
pub mod splitter;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use completion::CompletionService;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, RawDocument, Record, RetrievalResult, ScoredChunk};
pub use embedding::EmbeddingService;
pub use error::{LoadError, RagError, Result};
pub use index::{IndexBuilder, VectorIndex};
pub use loader::{DocumentFormat, load, preview};
pub use orchestrator::{Orchestrator, build_prompt};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use splitter::{RecursiveSplitter, Splitter, split};
