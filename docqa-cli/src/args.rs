//! Command line arguments.
//!
//! Every tuning flag is optional so that a value left unset on the command
//! line (and in the environment) falls through to the `--config` file, then to
//! the built-in default.

use std::path::PathBuf;

use clap::{Parser, ValueEnum, value_parser};

/// Ask questions about a document using local models served by Ollama
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about, long_about = None)]
pub struct Cli {
    /// Document to ask about (.txt, .csv, .pdf or .docx)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Question to ask; repeat for several. Opens an interactive prompt when omitted
    #[arg(short = 'q', long = "question", value_name = "QUESTION")]
    pub questions: Vec<String>,

    /// Completion model (smaller is faster)
    #[arg(long, value_enum, env = "DOCQA_MODEL")]
    pub model: Option<CompletionModel>,

    /// Embedding model (smaller is faster)
    #[arg(long, value_enum, env = "DOCQA_EMBEDDING_MODEL")]
    pub embedding_model: Option<EmbeddingModel>,

    /// Number of context chunks per question (lower is faster)
    #[arg(short = 'k', long = "top-k", env = "DOCQA_TOP_K", value_parser = value_parser!(u8).range(1..=5))]
    pub top_k: Option<u8>,

    /// Maximum chunk length in characters
    #[arg(long, env = "DOCQA_CHUNK_SIZE", value_parser = value_parser!(u16).range(200..=1000))]
    pub chunk_size: Option<u16>,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", value_parser = value_parser!(u16).range(0..=200))]
    pub chunk_overlap: Option<u16>,

    /// Ollama server address
    #[arg(long, env = "DOCQA_OLLAMA_URL", value_name = "URL")]
    pub ollama_url: Option<String>,

    /// Timeout for each embedding or completion request, in seconds
    #[arg(long, env = "DOCQA_TIMEOUT_SECS", value_parser = value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Directory to save the built index in
    #[arg(long, env = "DOCQA_PERSIST_DIR", value_name = "DIR")]
    pub persist_dir: Option<PathBuf>,

    /// TOML settings file applied beneath command line flags
    #[arg(short, long, env = "DOCQA_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the retrieved chunks under each answer
    #[arg(long)]
    pub show_context: bool,

    /// Log output format
    #[arg(long, value_enum, env = "DOCQA_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Completion models offered on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionModel {
    #[value(name = "llama3.2")]
    Llama32,
    #[value(name = "llama2")]
    Llama2,
    #[value(name = "phi3")]
    Phi3,
    #[value(name = "mistral")]
    Mistral,
    #[value(name = "tinyllama")]
    TinyLlama,
}

impl CompletionModel {
    /// The Ollama model tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llama32 => "llama3.2",
            Self::Llama2 => "llama2",
            Self::Phi3 => "phi3",
            Self::Mistral => "mistral",
            Self::TinyLlama => "tinyllama",
        }
    }
}

/// Embedding models offered on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingModel {
    #[value(name = "nomic-embed-text")]
    NomicEmbedText,
    #[value(name = "mxbai-embed-large")]
    MxbaiEmbedLarge,
    #[value(name = "tiny-embed")]
    TinyEmbed,
}

impl EmbeddingModel {
    /// The Ollama model tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NomicEmbedText => "nomic-embed-text",
            Self::MxbaiEmbedLarge => "mxbai-embed-large",
            Self::TinyEmbed => "tiny-embed",
        }
    }
}

/// How log events are written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}
