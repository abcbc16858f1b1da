//! Lightweight Ollama client for synchronous text generation.
//!
//! Implements a thin client for the local Ollama API:
//! `POST {endpoint}/api/generate` with `stream=false`.
//!
//! Generation failures are ordinary errors here; the caller decides whether to
//! degrade (the retrieval demo substitutes a sentinel answer string).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::GenModelConfig;
use crate::error_handler::{AiEmbedError, Result, validate_http_endpoint};

/// Maximum number of response-body characters kept in error messages.
const SNIPPET_CHARS: usize = 500;

/// Thin client for Ollama generation.
pub struct OllamaService {
    client: reqwest::Client,
    cfg: GenModelConfig,
    url_generate: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - [`crate::ConfigError::InvalidFormat`] if the endpoint is not http(s)
    /// - [`AiEmbedError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: GenModelConfig) -> Result<Self> {
        validate_http_endpoint("OLLAMA_HOST", &cfg.endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let url_generate = format!("{}/api/generate", base);

        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Generation model identifier this client was configured with.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Performs a **non-streaming** generation request via `/api/generate`.
    ///
    /// # Errors
    /// - [`AiEmbedError::HttpStatus`] for non-2xx responses
    /// - [`AiEmbedError::Transport`] for client errors
    /// - [`AiEmbedError::Decode`] if the response cannot be parsed
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            stream: false,
        };

        debug!("POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(SNIPPET_CHARS).collect::<String>();
            return Err(AiEmbedError::HttpStatus {
                status,
                url,
                snippet,
            });
        }

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            AiEmbedError::Decode(format!("serde error: {e}; ensure `stream=false` is used"))
        })?;

        Ok(out.response)
    }
}

/* ==========================
HTTP payloads
========================== */

/// Request body for `/api/generate` (non-streaming).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body for `/api/generate`; the generated text is in `response`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
