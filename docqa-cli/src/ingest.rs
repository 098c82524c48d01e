//! Turning a staged upload into an index, with the CSV-as-text retry.

use std::fmt;
use std::path::{Path, PathBuf};

use docqa_rag::loader::PREVIEW_LINES;
use docqa_rag::{RagError, RagPipeline, VectorIndex, preview};
use tracing::{error, info, warn};

use crate::staging::{is_csv, rename_to_text};

/// A document that is indexed and ready for questions.
#[derive(Debug)]
pub struct Ingested {
    /// The index built from the document.
    pub index: VectorIndex,
    /// The staged file the index was built from.
    pub path: PathBuf,
    /// Whether a `.csv` upload had to be renamed and read as plain text.
    pub retried_as_text: bool,
}

/// Why an upload could not be indexed.
#[derive(Debug)]
pub struct IngestFailure {
    /// The file of the last attempt.
    pub path: PathBuf,
    /// The error of the last attempt.
    pub error: RagError,
    /// The CSV error, when the upload was retried as plain text.
    pub csv_error: Option<RagError>,
}

impl IngestFailure {
    /// Whether the error already shows the first lines of the file.
    fn has_preview(&self) -> bool {
        matches!(&self.error, RagError::Load(e) if e.preview.is_some())
    }
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.csv_error {
            Some(csv_error) => write!(
                f,
                "Failed to load as CSV and as plain text.\nAs CSV: {csv_error}\nAs plain text: {}",
                self.error
            )?,
            None => write!(f, "Failed to load or embed document: {}", self.error)?,
        }
        if !self.has_preview() {
            write!(
                f,
                "\nFile preview (first {PREVIEW_LINES} lines):\n{}",
                preview(&self.path, PREVIEW_LINES)
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for IngestFailure {}

/// Ingest a staged upload.
///
/// A `.csv` upload that fails to load is renamed to `.txt` and ingested once
/// more; the failure then reports both attempts.
pub async fn ingest_upload(pipeline: &RagPipeline, staged: &Path) -> Result<Ingested, IngestFailure> {
    let error = match pipeline.ingest(staged).await {
        Ok(index) => {
            return Ok(Ingested { index, path: staged.to_path_buf(), retried_as_text: false });
        }
        Err(error) => error,
    };

    if !(is_csv(staged) && matches!(error, RagError::Load(_))) {
        error!(path = %staged.display(), %error, "ingest failed");
        return Err(IngestFailure { path: staged.to_path_buf(), error, csv_error: None });
    }

    warn!(path = %staged.display(), %error, "CSV ingest failed, retrying as plain text");
    let renamed = match rename_to_text(staged) {
        Ok(renamed) => renamed,
        Err(e) => {
            error!(path = %staged.display(), error = %e, "could not rename upload");
            return Err(IngestFailure { path: staged.to_path_buf(), error, csv_error: None });
        }
    };

    match pipeline.ingest(&renamed).await {
        Ok(index) => {
            info!(path = %renamed.display(), "indexed CSV upload as plain text");
            Ok(Ingested { index, path: renamed, retried_as_text: true })
        }
        Err(retry_error) => {
            error!(path = %renamed.display(), error = %retry_error, "plain-text retry failed");
            Err(IngestFailure { path: renamed, error: retry_error, csv_error: Some(error) })
        }
    }
}
