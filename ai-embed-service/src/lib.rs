//! Shared clients for the two model services this tooling talks to:
//!
//! - A remote embedding API (VoyageAI-style `POST /v1/embeddings`, one vector
//!   per input text, order-preserving).
//! - A local Ollama server for synchronous text generation
//!   (`POST {endpoint}/api/generate` with `stream=false`).
//!
//! Both clients share a unified error type ([`AiEmbedError`]) and the embedding
//! client wraps its HTTP call in a bounded [`RetryPolicy`].

pub mod config;
pub mod error_handler;
pub mod retry;
pub mod services;

pub use config::{EmbedModelConfig, GenModelConfig};
pub use error_handler::{AiEmbedError, ConfigError, Result};
pub use retry::{RetryPolicy, with_retry};
pub use services::ollama_service::OllamaService;
pub use services::voyage_service::VoyageService;
