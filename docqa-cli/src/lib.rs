//! # docqa-cli
//!
//! Command-line front end for [`docqa_rag`]: upload a document, index it with
//! a local Ollama server, and ask questions about it.
//!
//! ```bash
//! docqa notes.txt -q "What color is the sky?" --show-context
//! docqa report.pdf --model phi3 -k 3        # interactive prompt
//! ```

pub mod app;
pub mod args;
pub mod ingest;
pub mod render;
pub mod settings;
pub mod staging;
pub mod telemetry;

pub use args::{Cli, CompletionModel, EmbeddingModel, LogFormat};
pub use settings::Settings;
