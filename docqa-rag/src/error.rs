//! Error types for the `docqa-rag` crate.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::loader::DocumentFormat;

/// Errors that can occur anywhere in the ingestion and answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension does not map to any supported [`DocumentFormat`].
    #[error("Unsupported file format: '{extension}'")]
    UnsupportedFormat {
        /// The lower-cased extension, empty if the path had none.
        extension: String,
    },

    /// A document could not be loaded, even after any fallback strategy.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A configuration or argument validation error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The embedding service was unreachable or rejected the request.
    #[error("Embedding service error ({model}): {message}")]
    EmbeddingService {
        /// The embedding model that was requested.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A query was embedded with a different model than the index was built with.
    #[error("Embedding model mismatch: index was built with '{index_model}', query uses '{query_model}'")]
    ModelMismatch {
        /// The model recorded in the index.
        index_model: String,
        /// The model the retriever was configured with.
        query_model: String,
    },

    /// The completion service failed to produce an answer.
    #[error("Completion error ({model}): {message}")]
    Completion {
        /// The completion model that was requested.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding or completion call did not finish within the configured timeout.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that expired, e.g. `"embedding"`.
        operation: String,
        /// The timeout that was exceeded.
        after: Duration,
    },

    /// The vector index rejected an operation or could not be persisted.
    #[error("Vector index error: {0}")]
    Index(String),
}

impl RagError {
    pub(crate) fn embedding(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingService { model: model.into(), message: message.into() }
    }

    pub(crate) fn completion(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Completion { model: model.into(), message: message.into() }
    }

    pub(crate) fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout { operation: operation.into(), after }
    }
}

/// A load failure normalized across every loader branch.
///
/// Carries the format that was attempted, the underlying cause, the failure
/// of the fallback format when one was tried, and a short textual preview of
/// the file when one can be derived.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadError {
    /// The file that failed to load.
    pub path: PathBuf,
    /// The format the loader attempted first.
    pub format: DocumentFormat,
    /// The underlying parser or I/O message.
    pub cause: String,
    /// The failure of the fallback format, if one was attempted.
    pub fallback: Option<Box<LoadError>>,
    /// The first lines of the file, or the reason they could not be read.
    pub preview: Option<String>,
}

impl LoadError {
    pub(crate) fn new(path: impl Into<PathBuf>, format: DocumentFormat, cause: impl Into<String>) -> Self {
        Self { path: path.into(), format, cause: cause.into(), fallback: None, preview: None }
    }

    pub(crate) fn with_fallback(mut self, fallback: LoadError) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub(crate) fn with_preview(mut self, preview: String) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Iterate over this failure and every nested fallback failure, outermost first.
    pub fn causes(&self) -> impl Iterator<Item = &LoadError> {
        std::iter::successors(Some(self), |e| e.fallback.as_deref())
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to load '{}' as {}: {}", self.path.display(), self.format, self.cause)?;
        if let Some(fallback) = &self.fallback {
            write!(f, "; {} fallback also failed: {}", fallback.format, fallback.cause)?;
        }
        if let Some(preview) = &self.preview {
            write!(f, "\nFirst lines of file:\n{preview}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LoadError {}

/// A convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
