//! Upload staging and ingestion failure handling.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use docqa_cli::ingest::ingest_upload;
use docqa_cli::staging::{UploadDir, is_csv, rename_to_text};
use docqa_rag::{CompletionService, EmbeddingService, RagError, RagPipeline};

/// Embeds text as letter, digit and whitespace counts.
struct CountingEmbedder;

#[async_trait]
impl EmbeddingService for CountingEmbedder {
    async fn embed(&self, text: &str, _model: &str) -> docqa_rag::Result<Vec<f32>> {
        let count = |f: fn(char) -> bool| text.chars().filter(|c| f(*c)).count() as f32;
        Ok(vec![count(char::is_alphabetic), count(char::is_numeric), count(char::is_whitespace), 1.0])
    }
}

struct DownEmbedder;

#[async_trait]
impl EmbeddingService for DownEmbedder {
    async fn embed(&self, _text: &str, model: &str) -> docqa_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingService { model: model.to_string(), message: "connection refused".to_string() })
    }
}

struct EchoCompletion;

#[async_trait]
impl CompletionService for EchoCompletion {
    async fn complete(&self, prompt: &str, _model: &str) -> docqa_rag::Result<String> {
        Ok(prompt.to_string())
    }
}

fn pipeline(embedder: Arc<dyn EmbeddingService>) -> RagPipeline {
    RagPipeline::builder()
        .embedding_service(embedder)
        .completion_service(Arc::new(EchoCompletion))
        .build()
        .unwrap()
}

#[test]
fn staging_copies_and_keeps_the_name() {
    let source_dir = tempfile::tempdir().unwrap();
    let source = source_dir.path().join("notes.txt");
    fs::write(&source, "The sky is blue.").unwrap();

    let uploads = UploadDir::new().unwrap();
    let staged = uploads.stage(&source).unwrap();

    assert_eq!(staged.parent(), Some(uploads.path()));
    assert_eq!(staged.file_name(), source.file_name());
    assert_eq!(fs::read_to_string(&staged).unwrap(), "The sky is blue.");
    assert!(source.exists());
}

#[test]
fn staging_a_missing_file_fails() {
    let uploads = UploadDir::new().unwrap();
    let err = uploads.stage(&uploads.path().join("nope.txt")).unwrap_err();
    assert!(err.to_string().contains("failed to upload"));
}

#[test]
fn upload_dir_is_removed_on_drop() {
    let uploads = UploadDir::new().unwrap();
    let path = uploads.path().to_path_buf();
    drop(uploads);
    assert!(!path.exists());
}

#[test]
fn csv_detection_and_rename() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.CSV");
    fs::write(&path, "a,b").unwrap();

    assert!(is_csv(&path));
    assert!(!is_csv(&dir.path().join("data.txt")));

    let renamed = rename_to_text(&path).unwrap();
    assert_eq!(renamed, dir.path().join("data.txt"));
    assert!(renamed.exists());
    assert!(!path.exists());
}

#[tokio::test]
async fn valid_csv_is_indexed_without_retry() {
    let uploads = UploadDir::new().unwrap();
    let staged = uploads.path().join("colors.csv");
    fs::write(&staged, "thing,color\nsky,blue\n").unwrap();

    let ingested = ingest_upload(&pipeline(Arc::new(CountingEmbedder)), &staged).await.unwrap();
    assert!(!ingested.retried_as_text);
    assert_eq!(ingested.path, staged);
    assert_eq!(ingested.index.len().await, 1);
}

#[tokio::test]
async fn failing_csv_is_retried_as_text_and_both_errors_reported() {
    let uploads = UploadDir::new().unwrap();
    let staged = uploads.path().join("data.csv");
    fs::write(&staged, b"a,b\n\xff,1\n").unwrap();

    let failure = ingest_upload(&pipeline(Arc::new(CountingEmbedder)), &staged).await.unwrap_err();

    assert_eq!(failure.path, uploads.path().join("data.txt"));
    assert!(failure.path.exists());
    assert!(!staged.exists());
    assert!(matches!(failure.csv_error, Some(RagError::Load(_))));
    assert!(matches!(failure.error, RagError::Load(_)));

    let report = failure.to_string();
    assert!(report.starts_with("Failed to load as CSV and as plain text."));
    assert!(report.contains("First lines of file:"));
    assert!(!report.contains("File preview"));
}

#[tokio::test]
async fn service_failure_reports_a_preview() {
    let uploads = UploadDir::new().unwrap();
    let staged = uploads.path().join("notes.txt");
    fs::write(&staged, "line one\nline two\n").unwrap();

    let failure = ingest_upload(&pipeline(Arc::new(DownEmbedder)), &staged).await.unwrap_err();

    assert!(failure.csv_error.is_none());
    assert!(matches!(failure.error, RagError::EmbeddingService { .. }));
    let report = failure.to_string();
    assert!(report.starts_with("Failed to load or embed document: Embedding service error"));
    assert!(report.ends_with("File preview (first 5 lines):\nline one\nline two"));
}

#[tokio::test]
async fn service_failure_on_csv_is_not_retried() {
    let uploads = UploadDir::new().unwrap();
    let staged = uploads.path().join("colors.csv");
    fs::write(&staged, "thing,color\nsky,blue\n").unwrap();

    let failure = ingest_upload(&pipeline(Arc::new(DownEmbedder)), &staged).await.unwrap_err();
    assert!(failure.csv_error.is_none());
    assert!(staged.exists());
}
