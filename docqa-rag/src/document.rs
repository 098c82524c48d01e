//! Data types for loaded documents, chunks, and retrieval results.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::loader::DocumentFormat;

/// Metadata key holding the originating file path of a record.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 1-based page number of a PDF record.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the 0-based row index of a CSV record or DOCX table row.
pub const ROW_KEY: &str = "row";
/// Metadata key holding the 0-based paragraph index of a DOCX record.
pub const PARAGRAPH_KEY: &str = "paragraph";
/// Metadata key holding the 0-based table index of a DOCX table-row record.
pub const TABLE_KEY: &str = "table";

/// One unit of raw text produced by a loader: a page, a row, a paragraph,
/// or a whole plain-text file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// The extracted text.
    pub content: String,
    /// Where the text came from (source path, page, row, ...).
    pub metadata: HashMap<String, String>,
}

impl Record {
    /// Create a record with the given content and metadata.
    pub fn new(content: impl Into<String>, metadata: HashMap<String, String>) -> Self {
        Self { content: content.into(), metadata }
    }
}

/// The ordered records loaded from a single file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawDocument {
    /// Unique identifier for this load of the document.
    pub id: String,
    /// The format that produced the records. A CSV file that fell back to
    /// plain-text loading reports [`DocumentFormat::Text`].
    pub format: DocumentFormat,
    /// The file the document was loaded from.
    pub source: PathBuf,
    /// The records in file order.
    pub records: Vec<Record>,
}

impl RawDocument {
    /// Whether the document has no records or only empty records.
    pub fn is_blank(&self) -> bool {
        self.records.iter().all(|r| r.content.trim().is_empty())
    }
}

/// A bounded slice of a [`Record`], the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the parent [`RawDocument`].
    pub document_id: String,
    /// Position of the originating record within the document.
    pub record_index: usize,
    /// Position of this chunk in the document's chunk sequence.
    pub index: usize,
    /// The chunk text.
    pub content: String,
    /// Metadata copied unchanged from the originating record.
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Chunks ranked by descending similarity, at most `k` long.
pub type RetrievalResult = Vec<ScoredChunk>;

/// The orchestrator's reply: the raw completion plus the chunks it was given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The completion service's output, unmodified.
    pub answer: String,
    /// The chunks that formed the prompt context, in ranked order.
    pub used_chunks: RetrievalResult,
}
