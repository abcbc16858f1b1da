//! Client for a VoyageAI-style embedding API.
//!
//! One call embeds a whole batch: `POST {endpoint}/v1/embeddings` with
//! `{model, input: [texts...]}` returns one fixed-length vector per input,
//! preserving input order. The call is wrapped in a bounded [`RetryPolicy`];
//! a 401 is surfaced immediately as [`AiEmbedError::Auth`] and never retried.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::EmbedModelConfig;
use crate::error_handler::{AiEmbedError, Result, validate_http_endpoint};
use crate::retry::{RetryPolicy, with_retry};

/// Maximum number of response-body characters kept in error messages.
const SNIPPET_CHARS: usize = 500;

/// Thin client for the embedding API.
///
/// Reuses one HTTP client with a configurable timeout. The only high-level
/// calls are [`VoyageService::embed_batch`] and [`VoyageService::embed_one`].
pub struct VoyageService {
    client: reqwest::Client,
    cfg: EmbedModelConfig,
    policy: RetryPolicy,
    url_embeddings: String,
}

impl VoyageService {
    /// Creates a new client from the given config and retry policy.
    ///
    /// # Errors
    /// - [`crate::ConfigError::InvalidFormat`] if the endpoint is not http(s)
    /// - [`AiEmbedError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: EmbedModelConfig, policy: RetryPolicy) -> Result<Self> {
        validate_http_endpoint("EMBEDDING_ENDPOINT", &cfg.endpoint)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        let base = cfg.endpoint.trim_end_matches('/').to_string();
        let url_embeddings = format!("{}/v1/embeddings", base);

        Ok(Self {
            client,
            cfg,
            policy,
            url_embeddings,
        })
    }

    /// Embedding model identifier this client was configured with.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Embeds a batch of texts in a single multi-input request, retrying per
    /// the configured policy.
    ///
    /// Returns one vector per input, in input order.
    ///
    /// # Errors
    /// - [`AiEmbedError::Auth`] on credential rejection (not retried)
    /// - [`AiEmbedError::RetriesExhausted`] once all attempts fail
    /// - [`AiEmbedError::CountMismatch`] if the response size disagrees
    #[instrument(skip_all, fields(model = %self.cfg.model, inputs = texts.len()))]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        with_retry(&self.policy, "embedding request", || {
            self.request_embeddings(texts)
        })
        .await
    }

    /// Embeds a single text (used for query embedding in retrieval).
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors
            .pop()
            .ok_or_else(|| AiEmbedError::CountMismatch { got: 0, want: 1 })
    }

    /// One HTTP round-trip, no retry.
    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: texts,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AiEmbedError::Auth {
                url: self.url_embeddings.clone(),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(SNIPPET_CHARS).collect::<String>();
            return Err(AiEmbedError::HttpStatus {
                status,
                url: self.url_embeddings.clone(),
                snippet,
            });
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            AiEmbedError::Decode(format!(
                "serde error: {e}; expected `{{ data: [{{ embedding: number[] }}] }}`"
            ))
        })?;

        into_vectors(out, texts.len())
    }
}

/// Unpacks the response rows in order, rejecting count mismatches.
fn into_vectors(resp: EmbeddingsResponse, want: usize) -> Result<Vec<Vec<f32>>> {
    if resp.data.len() != want {
        return Err(AiEmbedError::CountMismatch {
            got: resp.data.len(),
            want,
        });
    }
    Ok(resp.data.into_iter().map(|row| row.embedding).collect())
}

/* ==========================
HTTP payloads
========================== */

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body for `/v1/embeddings`. Rows are in input order.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

/// One row of the response.
#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_preserves_input_order() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2]},{"embedding":[0.3,0.4]}],"model":"voyage-3-large"}"#;
        let resp: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        let vectors = into_vectors(resp, 2).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2]);
        assert_eq!(vectors[1], vec![0.3, 0.4]);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let raw = r#"{"data":[{"embedding":[0.1]}]}"#;
        let resp: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        let err = into_vectors(resp, 2).unwrap_err();
        match err {
            AiEmbedError::CountMismatch { got, want } => {
                assert_eq!(got, 1);
                assert_eq!(want, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
