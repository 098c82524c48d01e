//! Upload staging.
//!
//! The document is copied into a private temporary directory before it is
//! loaded, so a rename during the CSV retry never touches the user's file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use docqa_rag::DocumentFormat;
use tempfile::TempDir;
use tracing::debug;

/// A temporary uploads directory, removed when dropped.
#[derive(Debug)]
pub struct UploadDir {
    dir: TempDir,
}

impl UploadDir {
    /// Create a fresh uploads directory under the system temp dir.
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("docqa-uploads-")
            .tempdir()
            .context("failed to create uploads directory")?;
        Ok(Self { dir })
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy `source` into the uploads directory, keeping its file name.
    pub fn stage(&self, source: &Path) -> anyhow::Result<PathBuf> {
        let name = source
            .file_name()
            .with_context(|| format!("'{}' does not name a file", source.display()))?;
        let staged = self.dir.path().join(name);
        fs::copy(source, &staged)
            .with_context(|| format!("failed to upload '{}'", source.display()))?;
        debug!(source = %source.display(), staged = %staged.display(), "staged upload");
        Ok(staged)
    }
}

/// Whether `path` has a `.csv` extension.
pub fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension)
        .is_some_and(|f| f == DocumentFormat::Csv)
}

/// Rename `path` to the same name with a `.txt` extension and return the new path.
pub fn rename_to_text(path: &Path) -> io::Result<PathBuf> {
    let renamed = path.with_extension(DocumentFormat::Text.extension());
    fs::rename(path, &renamed)?;
    Ok(renamed)
}
