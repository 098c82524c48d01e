//! Layered settings: built-in defaults, then an optional TOML file, then
//! command line flags and `DOCQA_*` environment variables.
//!
//! ```toml
//! ollama_url = "http://localhost:11434"
//! show_context = true
//!
//! [rag]
//! chunk_size = 600
//! top_k = 3
//! completion_model = "phi3"
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use docqa_rag::RagConfig;
use docqa_rag::ollama::DEFAULT_OLLAMA_URL;
use serde::Deserialize;

use crate::args::Cli;

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Ollama server address.
    pub ollama_url: String,
    /// Print retrieved chunks under each answer.
    pub show_context: bool,
    /// Pipeline configuration.
    pub rag: RagConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self { ollama_url: DEFAULT_OLLAMA_URL.to_string(), show_context: false, rag: RagConfig::default() }
    }
}

impl Settings {
    /// Resolve the settings for `cli`, reading its `--config` file if given.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or the merged pipeline
    /// configuration is invalid.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        settings.rag.validate().context("invalid settings")?;
        Ok(settings)
    }

    /// Parse a TOML settings file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse settings file '{}'", path.display()))
    }

    /// Overwrite every setting the command line (or environment) provided.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(model) = cli.model {
            self.rag.completion_model = model.as_str().to_string();
        }
        if let Some(model) = cli.embedding_model {
            self.rag.embedding_model = model.as_str().to_string();
        }
        if let Some(k) = cli.top_k {
            self.rag.top_k = usize::from(k);
        }
        if let Some(size) = cli.chunk_size {
            self.rag.chunk_size = usize::from(size);
        }
        if let Some(overlap) = cli.chunk_overlap {
            self.rag.chunk_overlap = usize::from(overlap);
        }
        if let Some(secs) = cli.timeout_secs {
            self.rag.request_timeout_secs = secs;
        }
        if let Some(dir) = &cli.persist_dir {
            self.rag.persist_dir = Some(dir.clone());
        }
        if let Some(url) = &cli.ollama_url {
            self.ollama_url = url.clone();
        }
        self.show_context |= cli.show_context;
    }
}
