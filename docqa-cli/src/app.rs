//! The `docqa` run: configure, stage, ingest, then answer questions.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use docqa_rag::ollama::{OllamaCompletionService, OllamaEmbeddingService};
use docqa_rag::{RagPipeline, VectorIndex};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{error, info};

use crate::args::Cli;
use crate::ingest::ingest_upload;
use crate::render::render_answer;
use crate::settings::Settings;
use crate::staging::UploadDir;

const PROMPT: &str = "question> ";

/// Build a pipeline that talks to the Ollama server named in `settings`.
pub fn ollama_pipeline(settings: &Settings) -> anyhow::Result<RagPipeline> {
    let timeout = settings.rag.request_timeout();
    let embedder = OllamaEmbeddingService::new(&settings.ollama_url, timeout)?;
    let completion = OllamaCompletionService::new(&settings.ollama_url, timeout)?;

    let pipeline = RagPipeline::builder()
        .config(settings.rag.clone())
        .embedding_service(Arc::new(embedder))
        .completion_service(Arc::new(completion))
        .build()?;
    Ok(pipeline)
}

/// Run the command line program.
///
/// Returns a failure exit code, rather than an error, when the document
/// cannot be indexed or a question cannot be answered: those failures have
/// already been reported to the user.
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = Settings::load(&cli)?;
    info!(
        ollama_url = %settings.ollama_url,
        embedding_model = %settings.rag.embedding_model,
        completion_model = %settings.rag.completion_model,
        top_k = settings.rag.top_k,
        "starting"
    );
    let pipeline = ollama_pipeline(&settings)?;

    let uploads = UploadDir::new()?;
    let staged = uploads.stage(&cli.file)?;
    println!("Uploaded {}", display_name(&cli.file));

    let ingested = match ingest_upload(&pipeline, &staged).await {
        Ok(ingested) => ingested,
        Err(failure) => {
            eprintln!("{failure}");
            return Ok(ExitCode::FAILURE);
        }
    };
    if ingested.retried_as_text {
        println!("Document indexed as plain text and ready for Q&A!");
    } else {
        println!("Document indexed and ready for Q&A!");
    }

    if cli.questions.is_empty() {
        interactive(&pipeline, &ingested.index, settings.show_context).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut failed = false;
    for question in &cli.questions {
        failed |= !ask(&pipeline, &ingested.index, question, settings.show_context).await;
    }
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Answer one question and print the result. Returns whether it succeeded.
async fn ask(pipeline: &RagPipeline, index: &VectorIndex, question: &str, show_context: bool) -> bool {
    println!("\nQuestion: {question}");
    match pipeline.ask(index, question).await {
        Ok(answer) => {
            println!("{}", render_answer(&answer, show_context, &chrono::Local::now()));
            true
        }
        Err(e) => {
            error!(error = %e, "question failed");
            eprintln!("Failed to answer: {e}");
            false
        }
    }
}

async fn interactive(pipeline: &RagPipeline, index: &VectorIndex, show_context: bool) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new().context("failed to start interactive prompt")?;
    println!("Ask a question about your document (empty line to skip, 'exit' to quit).");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read question"),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(question);
        ask(pipeline, index, question, show_context).await;
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}
