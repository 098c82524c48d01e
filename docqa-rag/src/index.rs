//! In-memory vector index with exact cosine-similarity search.
//!
//! A [`VectorIndex`] holds one embedding per [`Chunk`] in insertion order,
//! behind a `tokio::sync::RwLock`: any number of searches may run
//! concurrently against a shared index, and [`IndexBuilder::extend`] takes
//! the write lock only for the final insert.
//!
//! [`IndexBuilder`] embeds chunks through an [`EmbeddingService`] and fills
//! the index. When the index has a persistence directory it is written to
//! `{dir}/index.json` after every build or extend and can be restored with
//! [`VectorIndex::open`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, ScoredChunk};
use crate::embedding::{EmbeddingService, embed_with_timeout};
use crate::error::{RagError, Result};

/// File name of a persisted index inside its directory.
pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

#[derive(Debug, Default)]
struct IndexState {
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    embedding_model: String,
    dimensions: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// Embeddings for one document's chunks, searchable by cosine similarity.
///
/// The index remembers which embedding model produced its vectors so that
/// queries embedded with another model can be rejected.
#[derive(Debug)]
pub struct VectorIndex {
    embedding_model: String,
    persist_dir: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index for vectors produced by `embedding_model`.
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            persist_dir: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Back this index with a directory it is saved to after each build or extend.
    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    /// The embedding model the stored vectors were produced with.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// The persistence directory, if any.
    pub fn persist_dir(&self) -> Option<&Path> {
        self.persist_dir.as_deref()
    }

    /// The vector dimensionality, or `None` while the index is empty.
    pub async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// The indexed chunks in insertion order.
    pub async fn chunks(&self) -> Vec<Chunk> {
        self.state.read().await.entries.iter().map(|e| e.chunk.clone()).collect()
    }

    /// Insert pre-embedded chunks.
    ///
    /// The insert is all-or-nothing: every pair is validated before any is added.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if a chunk ID is already present (in the
    /// index or earlier in `entries`), or a vector is empty or has a
    /// different dimensionality than the rest of the index.
    pub async fn insert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<()> {
        self.commit(entries, None).await
    }

    /// Validate `entries`, write the grown index to `persist_to` if given,
    /// and only then add them in memory.
    async fn commit(&self, entries: Vec<(Chunk, Vec<f32>)>, persist_to: Option<&Path>) -> Result<()> {
        let mut state = self.state.write().await;
        let dimensions = validate(&state, &entries)?;

        if let Some(dir) = persist_to {
            let snapshot = IndexSnapshot {
                embedding_model: self.embedding_model.clone(),
                dimensions,
                entries: state
                    .entries
                    .iter()
                    .cloned()
                    .chain(entries.iter().map(|(chunk, embedding)| IndexEntry {
                        chunk: chunk.clone(),
                        embedding: embedding.clone(),
                    }))
                    .collect(),
            };
            write_snapshot(dir, &snapshot).await?;
        }

        state.dimensions = dimensions;
        for (chunk, embedding) in entries {
            state.ids.insert(chunk.id.clone());
            state.entries.push(IndexEntry { chunk, embedding });
        }
        Ok(())
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// Results are ordered by descending cosine similarity; equal scores keep
    /// insertion order. Returns fewer than `k` results when the index is
    /// smaller than `k`, and none when it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if `query` does not match the index dimensionality.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self.state.read().await;
        if let Some(dimensions) = state.dimensions {
            if query.len() != dimensions {
                return Err(RagError::Index(format!(
                    "query has {} dimensions, index expects {dimensions}",
                    query.len()
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = state
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query)))
            .collect();

        // sort_by is stable, so ties stay in insertion order; NaN ranks last
        scored.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { chunk: state.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Write the index to `{dir}/index.json`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] on serialization or I/O failure.
    pub async fn persist(&self, dir: impl AsRef<Path>) -> Result<()> {
        let snapshot = {
            let state = self.state.read().await;
            IndexSnapshot {
                embedding_model: self.embedding_model.clone(),
                dimensions: state.dimensions,
                entries: state.entries.clone(),
            }
        };
        write_snapshot(dir.as_ref(), &snapshot).await
    }

    /// Restore an index previously written with [`persist`](Self::persist).
    ///
    /// The restored index keeps `dir` as its persistence directory.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] if the file is missing, unreadable, or
    /// violates the index invariants.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(INDEX_FILE_NAME);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RagError::Index(format!("failed to read '{}': {e}", path.display())))?;
        let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| RagError::Index(format!("failed to parse '{}': {e}", path.display())))?;

        let index = VectorIndex::new(snapshot.embedding_model).with_persist_dir(dir);
        index.insert(snapshot.entries.into_iter().map(|e| (e.chunk, e.embedding)).collect()).await?;

        let chunk_count = index.len().await;
        info!(path = %path.display(), chunk_count, "opened vector index");
        Ok(index)
    }
}

/// Check `entries` against the index and each other, returning the
/// dimensionality the index will have once they are added.
fn validate(state: &IndexState, entries: &[(Chunk, Vec<f32>)]) -> Result<Option<usize>> {
    let mut dimensions = state.dimensions;
    let mut batch_ids = HashSet::with_capacity(entries.len());
    for (chunk, embedding) in entries {
        if embedding.is_empty() {
            return Err(RagError::Index(format!("chunk '{}' has an empty embedding", chunk.id)));
        }
        let expected = *dimensions.get_or_insert(embedding.len());
        if embedding.len() != expected {
            return Err(RagError::Index(format!(
                "chunk '{}' has {} dimensions, index expects {expected}",
                chunk.id,
                embedding.len()
            )));
        }
        if state.ids.contains(&chunk.id) || !batch_ids.insert(chunk.id.as_str()) {
            return Err(RagError::Index(format!("duplicate chunk id '{}'", chunk.id)));
        }
    }
    Ok(dimensions)
}

async fn write_snapshot(dir: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let json = serde_json::to_vec(snapshot)
        .map_err(|e| RagError::Index(format!("failed to serialize index: {e}")))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RagError::Index(format!("failed to create '{}': {e}", dir.display())))?;
    let path = dir.join(INDEX_FILE_NAME);
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| RagError::Index(format!("failed to write '{}': {e}", path.display())))?;

    debug!(path = %path.display(), "persisted vector index");
    Ok(())
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

/// Compute cosine similarity between two vectors.
///
/// Sums are accumulated in `f64` so large components do not overflow.
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Embeds chunks and loads them into a [`VectorIndex`].
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::IndexBuilder;
///
/// let index = IndexBuilder::new(embedder, "nomic-embed-text")
///     .batch_size(32)
///     .timeout(Duration::from_secs(60))
///     .build(chunks)
///     .await?;
/// ```
#[derive(Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingService>,
    model: String,
    batch_size: usize,
    timeout: Duration,
    persist_dir: Option<PathBuf>,
}

impl IndexBuilder {
    /// Create a builder that embeds with `model` through `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingService>, model: impl Into<String>) -> Self {
        Self {
            embedder,
            model: model.into(),
            batch_size: 32,
            timeout: Duration::from_secs(120),
            persist_dir: None,
        }
    }

    /// Set how many chunks are embedded per service call. Zero is treated as one.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the timeout applied to each embedding call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist built indexes under `dir`.
    pub fn persist_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.persist_dir = dir;
        self
    }

    /// Embed `chunks` and return a fresh index holding them in order.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingService`] if the service fails or returns a malformed reply,
    ///   including vectors whose lengths differ from each other or from the index.
    /// - [`RagError::Timeout`] if an embedding call exceeds the timeout.
    /// - [`RagError::Index`] on duplicate chunk IDs, inconsistent dimensions,
    ///   or a persistence failure.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<VectorIndex> {
        let mut index = VectorIndex::new(self.model.clone());
        if let Some(dir) = &self.persist_dir {
            index = index.with_persist_dir(dir.clone());
        }
        self.extend(&index, chunks).await?;
        Ok(index)
    }

    /// Embed `chunks` and append them to an existing index.
    ///
    /// Nothing is inserted unless every batch embeds successfully and, for an
    /// index with a persistence directory, the grown index is written to disk.
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build), plus [`RagError::ModelMismatch`] if the
    /// index was built with a different embedding model.
    pub async fn extend(&self, index: &VectorIndex, chunks: Vec<Chunk>) -> Result<()> {
        if index.embedding_model() != self.model {
            return Err(RagError::ModelMismatch {
                index_model: index.embedding_model().to_string(),
                query_model: self.model.clone(),
            });
        }

        let chunk_count = chunks.len();
        let mut dimensions = index.dimensions().await;
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunk_count);
        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            debug!(model = %self.model, batch_index, batch_size = texts.len(), "embedding batch");
            let vectors =
                embed_with_timeout(self.embedder.as_ref(), &texts, &self.model, dimensions, self.timeout)
                    .await?;
            dimensions = dimensions.or_else(|| vectors.first().map(Vec::len));
            embeddings.extend(vectors);
        }

        index.commit(chunks.into_iter().zip(embeddings).collect(), index.persist_dir()).await?;

        let total = index.len().await;
        info!(model = %self.model, chunk_count, total, "indexed chunks");
        Ok(())
    }
}
