//! Unified error types for the crate.

use ai_embed_service::AiEmbedError;
use mongodb::error::{Error as DbError, ErrorKind};
use thiserror::Error;

/// Top-level error for vector-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or missing configuration. Raised before any external call.
    #[error("config error: {0}")]
    Config(String),

    /// The database rejected our credentials. Distinct from other failures so
    /// operators can tell a bad key apart from a flaky network.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Driver/database errors (wrapped).
    #[error("database error: {0}")]
    Database(#[source] DbError),

    /// Embedding or generation service errors (wrapped).
    #[error("model service error: {0}")]
    Embedding(#[from] AiEmbedError),
}

impl StoreError {
    /// Classifies a driver error, pulling authentication failures out into
    /// their own variant.
    pub(crate) fn from_db(e: DbError) -> Self {
        if matches!(*e.kind, ErrorKind::Authentication { .. }) {
            StoreError::Auth(e.to_string())
        } else {
            StoreError::Database(e)
        }
    }
}
