//! Document loading, dispatched on file extension.
//!
//! Each [`DocumentFormat`] variant owns its parse strategy and, optionally, a
//! fallback format to try when that strategy fails. Adding a format means
//! adding a variant, its extension, and its parse function.
//!
//! | Format | Extension | Records                         |
//! |--------|-----------|---------------------------------|
//! | Text   | `.txt`    | one per file (empty file → one empty record) |
//! | Csv    | `.csv`    | one per row; falls back to Text |
//! | Pdf    | `.pdf`    | one per page                    |
//! | Docx   | `.docx`   | one per non-empty paragraph or table row |

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCell, TableCellContent,
    TableChild, TableRowChild,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{PAGE_KEY, PARAGRAPH_KEY, ROW_KEY, RawDocument, Record, SOURCE_KEY, TABLE_KEY};
use crate::error::{LoadError, RagError, Result};

/// Number of lines shown in a load-failure preview.
pub const PREVIEW_LINES: usize = 5;

/// The file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// UTF-8 plain text.
    Text,
    /// Comma-delimited tabular data with a header row.
    Csv,
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processor document.
    Docx,
}

impl DocumentFormat {
    /// Every supported format.
    pub const ALL: [DocumentFormat; 4] = [Self::Text, Self::Csv, Self::Pdf, Self::Docx];

    /// The file extension (without dot) this format is selected by.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Look up a format by extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == extension)
    }

    /// Select the format for a path from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] naming the extension (empty if
    /// the path has none).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension =
            path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
        Self::from_extension(&extension).ok_or(RagError::UnsupportedFormat { extension })
    }

    /// The format to retry with when this format's parser fails.
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Csv => Some(Self::Text),
            Self::Text | Self::Pdf | Self::Docx => None,
        }
    }

    /// Whether a line preview of the raw file is meaningful for this format.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::Csv)
    }

    fn parse(self, path: &Path) -> std::result::Result<Vec<Record>, String> {
        match self {
            Self::Text => parse_text(path),
            Self::Csv => parse_csv(path),
            Self::Pdf => parse_pdf(path),
            Self::Docx => parse_docx(path),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Csv => "CSV",
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        };
        f.write_str(name)
    }
}

/// Load a file into a [`RawDocument`], choosing the parser by extension.
///
/// When the selected format fails and declares a fallback, the fallback is
/// tried once. The returned document's `format` is the one that succeeded.
///
/// # Errors
///
/// - [`RagError::UnsupportedFormat`] for unknown extensions.
/// - [`RagError::Load`] when parsing (and any fallback) fails. For textual
///   formats the error carries a preview of the first [`PREVIEW_LINES`] lines.
pub fn load(path: impl AsRef<Path>) -> Result<RawDocument> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;

    let (format, records) = match format.parse(path) {
        Ok(records) => (format, records),
        Err(cause) => match format.fallback() {
            Some(fallback) => {
                warn!(path = %path.display(), %format, %fallback, error = %cause, "parse failed, retrying with fallback format");
                match fallback.parse(path) {
                    Ok(records) => (fallback, records),
                    Err(fallback_cause) => {
                        let error = LoadError::new(path, format, cause)
                            .with_fallback(LoadError::new(path, fallback, fallback_cause));
                        return Err(attach_preview(error).into());
                    }
                }
            }
            None => return Err(attach_preview(LoadError::new(path, format, cause)).into()),
        },
    };

    info!(path = %path.display(), %format, record_count = records.len(), "loaded document");

    Ok(RawDocument {
        id: uuid::Uuid::new_v4().to_string(),
        format,
        source: path.to_path_buf(),
        records,
    })
}

/// Read the first `lines` lines of a file, decoding lossily.
///
/// Never fails: if the file cannot be read, the returned string describes why.
pub fn preview(path: impl AsRef<Path>, lines: usize) -> String {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return format!("could not read file for preview: {e}"),
    };

    let mut out = Vec::with_capacity(lines);
    for line in BufReader::new(file).split(b'\n').take(lines) {
        match line {
            Ok(bytes) => out.push(String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_string()),
            Err(e) => return format!("could not read file for preview: {e}"),
        }
    }
    out.join("\n")
}

pub(crate) fn attach_preview(error: LoadError) -> LoadError {
    if error.format.is_textual() {
        let preview = preview(&error.path, PREVIEW_LINES);
        error.with_preview(preview)
    } else {
        error
    }
}

fn source_metadata(path: &Path) -> HashMap<String, String> {
    HashMap::from([(SOURCE_KEY.to_string(), path.display().to_string())])
}

fn parse_text(path: &Path) -> std::result::Result<Vec<Record>, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let content = String::from_utf8(bytes).map_err(|e| e.utf8_error().to_string())?;
    Ok(vec![Record::new(content, source_metadata(path))])
}

/// A file only counts as tabular if it has a header with at least two
/// columns and every row matches the header's width.
fn parse_csv(path: &Path) -> std::result::Result<Vec<Record>, String> {
    let mut reader =
        csv::ReaderBuilder::new().flexible(false).from_path(path).map_err(|e| e.to_string())?;

    let headers: Vec<String> =
        reader.headers().map_err(|e| e.to_string())?.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(String::is_empty) {
        return Err("no columns to parse from file".to_string());
    }
    if headers.len() < 2 {
        return Err("no delimiter found: expected at least two columns".to_string());
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_values = result.map_err(|e| e.to_string())?;

        let mut lines = Vec::with_capacity(headers.len());
        let mut metadata = HashMap::with_capacity(headers.len() + 2);
        for (column, value) in headers.iter().zip(row_values.iter()) {
            let value = value.trim();
            lines.push(format!("{column}: {value}"));
            metadata.insert(column.clone(), value.to_string());
        }
        metadata.extend(source_metadata(path));
        metadata.insert(ROW_KEY.to_string(), row.to_string());

        records.push(Record::new(lines.join("\n"), metadata));
    }

    debug!(path = %path.display(), columns = headers.len(), rows = records.len(), "parsed CSV");
    Ok(records)
}

fn parse_pdf(path: &Path) -> std::result::Result<Vec<Record>, String> {
    let document = lopdf::Document::load(path).map_err(|e| e.to_string())?;

    let pages = document.get_pages();
    let mut records = Vec::with_capacity(pages.len());
    for &page_number in pages.keys() {
        let content = match document.extract_text(&[page_number]) {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                warn!(path = %path.display(), page = page_number, error = %e, "no extractable text on page");
                String::new()
            }
        };

        let mut metadata = source_metadata(path);
        metadata.insert(PAGE_KEY.to_string(), page_number.to_string());
        records.push(Record::new(content, metadata));
    }

    Ok(records)
}

fn parse_docx(path: &Path) -> std::result::Result<Vec<Record>, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| e.to_string())?;

    let mut records = Vec::new();
    let mut paragraphs = 0;
    let mut tables = 0;
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(paragraph);
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let mut metadata = source_metadata(path);
                metadata.insert(PARAGRAPH_KEY.to_string(), paragraphs.to_string());
                records.push(Record::new(text, metadata));
                paragraphs += 1;
            }
            DocumentChild::Table(table) => {
                for (row, text) in table_rows(table).into_iter().enumerate() {
                    if text.is_empty() {
                        continue;
                    }
                    let mut metadata = source_metadata(path);
                    metadata.insert(TABLE_KEY.to_string(), tables.to_string());
                    metadata.insert(ROW_KEY.to_string(), row.to_string());
                    records.push(Record::new(text, metadata));
                }
                tables += 1;
            }
            _ => {}
        }
    }

    Ok(records)
}

/// One string per table row, non-empty cells joined with `" | "`.
fn table_rows(table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|TableChild::TableRow(row)| {
            row.cells
                .iter()
                .map(|TableRowChild::TableCell(cell)| cell_text(cell))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect()
}

fn cell_text(cell: &TableCell) -> String {
    let mut parts = Vec::new();
    for content in &cell.children {
        match content {
            TableCellContent::Paragraph(paragraph) => parts.push(paragraph_text(paragraph)),
            TableCellContent::Table(nested) => parts.extend(table_rows(nested)),
            _ => {}
        }
    }
    parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect::<Vec<_>>().join("\n")
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        push_paragraph_child(child, &mut text);
    }
    text
}

fn push_paragraph_child(child: &ParagraphChild, out: &mut String) {
    match child {
        ParagraphChild::Run(run) => push_run(run, out),
        ParagraphChild::Hyperlink(link) => {
            for child in &link.children {
                push_paragraph_child(child, out);
            }
        }
        _ => {}
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension(".docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("xlsx"), None);
    }

    #[test]
    fn unsupported_extension_is_named() {
        let err = DocumentFormat::from_path(Path::new("slides.pptx")).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { ref extension } if extension == "pptx"));

        let err = DocumentFormat::from_path(Path::new("Makefile")).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { ref extension } if extension.is_empty()));
    }

    #[test]
    fn only_csv_has_a_fallback() {
        for format in DocumentFormat::ALL {
            let expected = (format == DocumentFormat::Csv).then_some(DocumentFormat::Text);
            assert_eq!(format.fallback(), expected);
        }
    }

    #[test]
    fn preview_of_missing_file_describes_the_failure() {
        let preview = preview("/definitely/not/here.txt", PREVIEW_LINES);
        assert!(preview.starts_with("could not read file for preview:"));
    }
}
