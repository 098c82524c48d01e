//! Recursive chunk splitting.
//!
//! [`RecursiveSplitter`] breaks each record of a [`RawDocument`] into chunks
//! of at most `chunk_size` characters. It prefers to cut at paragraph breaks,
//! then line breaks, then sentence ends, then spaces, and only falls back to
//! a hard character cut when a piece has no boundary left. Consecutive chunks
//! cut from the same run of pieces share up to `chunk_overlap` trailing
//! characters.
//!
//! Lengths are counted in Unicode scalar values, not bytes.

use std::collections::VecDeque;

use crate::document::{Chunk, RawDocument};
use crate::error::{RagError, Result};

/// Boundaries tried in order, coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
pub trait Splitter: Send + Sync {
    /// Split every record of a document into chunks, in record order.
    ///
    /// Empty records produce no chunks. Chunk metadata is the originating
    /// record's metadata, unchanged.
    fn split(&self, document: &RawDocument) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{RecursiveSplitter, Splitter};
///
/// let splitter = RecursiveSplitter::new(400, 40)?;
/// let chunks = splitter.split(&document);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// Create a new `RecursiveSplitter`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// The maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The number of characters shared between consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a single text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() { Vec::new() } else { vec![trimmed.to_string()] };
        }

        let mut chunks = Vec::new();
        self.split_recursive(text, SEPARATORS, &mut chunks);
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let (pieces, remaining) = match separators.iter().position(|s| text.contains(s)) {
            Some(i) => (split_keeping_separator(text, separators[i]), &separators[i + 1..]),
            None => (split_chars(text), &[][..]),
        };

        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                self.merge(&pending, out);
                pending.clear();
            }
            self.split_recursive(piece, remaining, out);
        }

        if !pending.is_empty() {
            self.merge(&pending, out);
        }
    }

    /// Greedily pack pieces into chunks no longer than `chunk_size`. After a
    /// chunk is emitted, leading pieces are dropped until at most
    /// `chunk_overlap` characters remain to seed the next chunk.
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_chunk(&window, out);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_chunk(&window, out);
        }
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self { chunk_size: 400, chunk_overlap: 40 }
    }
}

impl Splitter for RecursiveSplitter {
    fn split(&self, document: &RawDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for (record_index, record) in document.records.iter().enumerate() {
            for content in self.split_text(&record.content) {
                let index = chunks.len();
                chunks.push(Chunk {
                    id: format!("{}_{index}", document.id),
                    document_id: document.id.clone(),
                    record_index,
                    index,
                    content,
                    metadata: record.metadata.clone(),
                });
            }
        }
        chunks
    }
}

/// Split a document with a [`RecursiveSplitter`] built from the given sizes.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfig`] if `chunk_overlap >= chunk_size` or
/// `chunk_size` is zero.
pub fn split(document: &RawDocument, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    Ok(RecursiveSplitter::new(chunk_size, chunk_overlap)?.split(document))
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn push_chunk(window: &VecDeque<(&str, usize)>, out: &mut Vec<String>) {
    let text: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_stays_with_preceding_segment() {
        assert_eq!(split_keeping_separator("a. b. c", ". "), vec!["a. ", "b. ", "c"]);
        assert_eq!(split_keeping_separator("no match", "\n\n"), vec!["no match"]);
    }

    #[test]
    fn hard_cut_applies_overlap() {
        let splitter = RecursiveSplitter::new(4, 2).unwrap();
        assert_eq!(splitter.split_text("abcdefgh"), vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let splitter = RecursiveSplitter::new(20, 0).unwrap();
        let chunks = splitter.split_text("First paragraph.\n\nSecond paragraph.");
        assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn word_overlap_repeats_trailing_words() {
        let splitter = RecursiveSplitter::new(11, 5).unwrap();
        let chunks = splitter.split_text("one two three four");
        assert_eq!(chunks, vec!["one two", "two three", "four"]);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let splitter = RecursiveSplitter::new(3, 0).unwrap();
        assert_eq!(splitter.split_text("日本語テキスト"), vec!["日本語", "テキス", "ト"]);
    }
}
