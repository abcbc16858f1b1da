//! Model-service configs loaded strictly from environment variables.
//!
//! Each process builds these once at startup and passes them into the service
//! constructors; no process-wide mutable state is kept.
//!
//! # Environment variables
//!
//! Embedding service:
//! - `VOYAGE_API_KEY`          = API key (mandatory)
//! - `EMBEDDING_ENDPOINT`      = base URL (default `https://api.voyageai.com`)
//! - `MODEL_NAME`              = embedding model id (default `voyage-3-large`)
//! - `EMBEDDING_TIMEOUT_SECS`  = per-request timeout (default 30)
//!
//! Generation service:
//! - `OLLAMA_HOST`             = Ollama endpoint (default `http://localhost:11434`)
//! - `LLM_MODEL`               = generation model id (default `mistral`)
//! - `GEN_TIMEOUT_SECS`        = per-request timeout (default 60)

use crate::error_handler::{Result, env_opt_u64, env_or, must_env, validate_http_endpoint};

/// Configuration for the remote embedding API client.
#[derive(Debug, Clone)]
pub struct EmbedModelConfig {
    /// Embedding model identifier (e.g., `"voyage-3-large"`).
    pub model: String,

    /// Base API URL, without the `/v1/embeddings` suffix.
    pub endpoint: String,

    /// Bearer token for the API.
    pub api_key: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl EmbedModelConfig {
    /// Builds the config from the environment.
    ///
    /// # Errors
    /// Returns a config error when `VOYAGE_API_KEY` is missing, the endpoint
    /// is malformed, or a numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let api_key = must_env("VOYAGE_API_KEY")?;
        let endpoint = env_or("EMBEDDING_ENDPOINT", "https://api.voyageai.com");
        validate_http_endpoint("EMBEDDING_ENDPOINT", &endpoint)?;
        let model = env_or("MODEL_NAME", "voyage-3-large");
        let timeout_secs = env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(30);

        Ok(Self {
            model,
            endpoint,
            api_key,
            timeout_secs,
        })
    }
}

/// Configuration for the local text-generation service.
#[derive(Debug, Clone)]
pub struct GenModelConfig {
    /// Generation model identifier (e.g., `"mistral"`).
    pub model: String,

    /// Ollama endpoint, e.g. `http://localhost:11434`.
    pub endpoint: String,

    /// Request timeout in seconds. Generation is slow; default is generous.
    pub timeout_secs: u64,
}

impl GenModelConfig {
    /// Builds the config from the environment.
    ///
    /// # Errors
    /// Returns a config error when the endpoint is malformed or a numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let endpoint = env_or("OLLAMA_HOST", "http://localhost:11434");
        validate_http_endpoint("OLLAMA_HOST", &endpoint)?;
        let model = env_or("LLM_MODEL", "mistral");
        let timeout_secs = env_opt_u64("GEN_TIMEOUT_SECS")?.unwrap_or(60);

        Ok(Self {
            model,
            endpoint,
            timeout_secs,
        })
    }
}
