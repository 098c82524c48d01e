//! Ollama-backed embedding and completion services.
//!
//! This module is only available when the `ollama` feature is enabled.
//! Both services talk to a local Ollama server over its JSON HTTP API:
//!
//! - `POST /api/embed` with `{ model, input: [..] }` → `{ embeddings: [[..]] }`
//! - `POST /api/generate` with `{ model, prompt, stream: false }` → `{ response }`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::CompletionService;
use crate::embedding::EmbeddingService;
use crate::error::{RagError, Result};

/// The default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Shared HTTP plumbing for both Ollama services.
#[derive(Debug, Clone)]
struct OllamaHttp {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaHttp {
    fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RagError::InvalidConfig("Ollama base URL must not be empty".to_string()));
        }
        Ok(Self { client, base_url, timeout })
    }

    /// POST `body` to `path` and decode the JSON reply.
    ///
    /// Transport timeouts surface as [`RagError::Timeout`]; every other
    /// failure is handed to `fail` to wrap in the caller's error variant.
    async fn post<B, R>(
        &self,
        path: &str,
        operation: &str,
        body: &B,
        fail: impl Fn(String) -> RagError,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            error!(%url, error = %e, "request failed");
            if e.is_timeout() {
                RagError::timeout(operation, self.timeout)
            } else {
                fail(format!("request to {url} failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(%url, %status, "API error");
            return Err(fail(format!("API returned {status}: {detail}")));
        }

        response.json().await.map_err(|e| {
            error!(%url, error = %e, "failed to parse response");
            if e.is_timeout() {
                RagError::timeout(operation, self.timeout)
            } else {
                fail(format!("failed to parse response: {e}"))
            }
        })
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// An [`EmbeddingService`] backed by a local Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaEmbeddingService;
///
/// let service = OllamaEmbeddingService::new("http://localhost:11434", Duration::from_secs(60))?;
/// let vector = service.embed("hello world", "nomic-embed-text").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingService {
    http: OllamaHttp,
}

impl OllamaEmbeddingService {
    /// Create a service for the server at `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if the HTTP client cannot be built
    /// or `base_url` is empty.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self { http: OllamaHttp::new(base_url, timeout)? })
    }

    /// The server address requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbeddingService {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text], model).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RagError::embedding(model, "API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Ollama", batch_size = texts.len(), model, "embedding batch");

        let request = EmbedRequest { model, input: texts };
        let response: EmbedResponse = self
            .http
            .post("/api/embed", "embedding", &request, |message| RagError::embedding(model, message))
            .await?;

        Ok(response.embeddings)
    }
}

/// A [`CompletionService`] backed by a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaCompletionService {
    http: OllamaHttp,
}

impl OllamaCompletionService {
    /// Create a service for the server at `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if the HTTP client cannot be built
    /// or `base_url` is empty.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self { http: OllamaHttp::new(base_url, timeout)? })
    }

    /// The server address requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }
}

#[async_trait]
impl CompletionService for OllamaCompletionService {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String> {
        debug!(provider = "Ollama", model, prompt_len = prompt.len(), "generating completion");

        let request = GenerateRequest { model, prompt, stream: false };
        let response: GenerateResponse = self
            .http
            .post("/api/generate", "completion", &request, |message| {
                RagError::completion(model, message)
            })
            .await?;

        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let service =
            OllamaEmbeddingService::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.base_url(), "http://localhost:11434");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = OllamaCompletionService::new("", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RagError::InvalidConfig(_)));
    }

    #[test]
    fn embed_request_serializes_batch_input() {
        let texts = ["a", "b"];
        let body = serde_json::to_value(EmbedRequest { model: "m", input: &texts }).unwrap();
        assert_eq!(body, serde_json::json!({ "model": "m", "input": ["a", "b"] }));
    }

    #[test]
    fn error_body_is_decoded() {
        let err: ErrorResponse = serde_json::from_str(r#"{"error":"model \"x\" not found"}"#).unwrap();
        assert_eq!(err.error, "model \"x\" not found");
    }
}
