//! Deterministic service doubles and fixture writers shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{CompletionService, EmbeddingService, RagError};

pub const DIM: usize = 64;

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325u64, |hash, b| (hash ^ b as u64).wrapping_mul(0x100000001b3))
}

/// Bag-of-words embedding: each token adds 1.0 to a hashed bucket.
///
/// Texts sharing words point in similar directions, and identical texts
/// embed identically.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for token in tokens(text) {
        vector[(fnv1a(&token) % DIM as u64) as usize] += 1.0;
    }
    vector
}

/// An embedding service backed by [`bag_of_words`] that records its calls.
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    pub calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub models: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingService for BagOfWordsEmbedder {
    async fn embed(&self, text: &str, model: &str) -> docqa_rag::Result<Vec<f32>> {
        Ok(self.embed_batch(&[text], model).await?.remove(0))
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> docqa_rag::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(texts.len());
        self.models.lock().unwrap().push(model.to_string());
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

/// An embedding service whose model is never available.
pub struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingService for UnreachableEmbedder {
    async fn embed(&self, _text: &str, model: &str) -> docqa_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingService {
            model: model.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// An embedding service that replies with one vector too few.
pub struct ShortReplyEmbedder;

#[async_trait]
impl EmbeddingService for ShortReplyEmbedder {
    async fn embed(&self, text: &str, _model: &str) -> docqa_rag::Result<Vec<f32>> {
        Ok(bag_of_words(text))
    }

    async fn embed_batch(&self, texts: &[&str], _model: &str) -> docqa_rag::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|t| bag_of_words(t)).collect())
    }
}

/// An embedding service whose vector length follows the text length, so
/// texts of different lengths get vectors of different dimensions.
pub struct RaggedEmbedder;

#[async_trait]
impl EmbeddingService for RaggedEmbedder {
    async fn embed(&self, text: &str, _model: &str) -> docqa_rag::Result<Vec<f32>> {
        Ok(vec![1.0; text.chars().count()])
    }
}

/// An embedding service that sleeps before answering.
pub struct SlowEmbedder(pub Duration);

#[async_trait]
impl EmbeddingService for SlowEmbedder {
    async fn embed(&self, text: &str, _model: &str) -> docqa_rag::Result<Vec<f32>> {
        tokio::time::sleep(self.0).await;
        Ok(bag_of_words(text))
    }
}

/// A completion service that answers with the context line sharing the most
/// words with the question, and records every prompt it receives.
#[derive(Default)]
pub struct ExtractiveCompletion {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionService for ExtractiveCompletion {
    async fn complete(&self, prompt: &str, _model: &str) -> docqa_rag::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let context = prompt
            .strip_prefix("Context:\n")
            .and_then(|rest| rest.split("\n\nQuestion: ").next())
            .unwrap_or_default();
        let question = prompt
            .rsplit("Question: ")
            .next()
            .and_then(|rest| rest.strip_suffix("\nAnswer:"))
            .unwrap_or_default();
        let question_tokens: HashSet<String> = tokens(question).into_iter().collect();

        let best = context
            .split(['\n', '.'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .max_by_key(|line| {
                let line_tokens: HashSet<String> = tokens(line).into_iter().collect();
                line_tokens.intersection(&question_tokens).count()
            })
            .unwrap_or("I don't know");
        Ok(best.to_string())
    }
}

/// A completion service that always fails.
pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _prompt: &str, model: &str) -> docqa_rag::Result<String> {
        Err(RagError::Completion { model: model.to_string(), message: "model not found".to_string() })
    }
}

/// A completion service that sleeps before answering.
pub struct SlowCompletion(pub Duration);

#[async_trait]
impl CompletionService for SlowCompletion {
    async fn complete(&self, _prompt: &str, _model: &str) -> docqa_rag::Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("too late".to_string())
    }
}

/// Write a PDF with one line of text per page.
pub fn write_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Write a DOCX with one paragraph per entry; empty entries become empty paragraphs.
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    use docx_rs::{Docx, Paragraph, Run};

    let mut docx = Docx::new();
    for text in paragraphs {
        let paragraph = if text.is_empty() {
            Paragraph::new()
        } else {
            Paragraph::new().add_run(Run::new().add_text(*text))
        };
        docx = docx.add_paragraph(paragraph);
    }
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}

/// Write a DOCX with one paragraph followed by a table of `rows`.
pub fn write_docx_with_table(path: &Path, paragraph: &str, rows: &[&[&str]]) {
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    let cell = |text: &str| TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)));
    let table = Table::new(
        rows.iter()
            .map(|cells| TableRow::new(cells.iter().map(|text| cell(text)).collect()))
            .collect(),
    );
    let docx = Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(paragraph)))
        .add_table(table);
    let file = std::fs::File::create(path).unwrap();
    docx.build().pack(file).unwrap();
}
