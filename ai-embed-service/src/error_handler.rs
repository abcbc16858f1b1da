//! Unified error handling for `ai-embed-service`.
//!
//! One top-level error type ([`AiEmbedError`]) for the whole crate, with
//! config-time problems grouped in [`ConfigError`]. Small helpers for reading
//! environment variables return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[AI Embed Service]` to simplify attribution
//! in logs.

use reqwest::StatusCode;
use thiserror::Error;

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiEmbedError>;

/// Top-level error for the `ai-embed-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiEmbedError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The remote service rejected our credentials. Never retried.
    #[error("[AI Embed Service] unauthorized by {url}: check the API key")]
    Auth {
        /// Request URL.
        url: String,
    },

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI Embed Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// Underlying HTTP transport error.
    #[error("[AI Embed Service] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response payload could not be decoded as expected.
    #[error("[AI Embed Service] failed to decode response: {0}")]
    Decode(String),

    /// The embedding API returned a different number of vectors than inputs.
    #[error("[AI Embed Service] embedding count mismatch: got {got}, want {want}")]
    CountMismatch { got: usize, want: usize },

    /// A retried operation failed on every attempt.
    #[error("[AI Embed Service] giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<AiEmbedError>,
    },
}

impl AiEmbedError {
    /// True for authentication rejections, which are fatal and never retried.
    pub fn is_auth(&self) -> bool {
        matches!(self, AiEmbedError::Auth { .. })
    }
}

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI Embed Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (limits, timeouts).
    #[error("[AI Embed Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `EMBEDDING_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI Embed Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `OLLAMA_HOST`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },
}

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Fetches an environment variable, falling back to a default when unset/empty.
pub fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a
/// valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.parse::<u64>().map(Some).map_err(|_| {
            AiEmbedError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        _ => Ok(None),
    }
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the string does not start with
/// a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}
