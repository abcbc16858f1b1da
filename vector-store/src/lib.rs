//! Embedding-vector lifecycle operations over a managed document database's
//! vector-search feature.
//!
//! This crate provides a clean API for the three standalone procedures the
//! tooling supports, plus field removal:
//! - Ensure a named vector-search index exists (and optionally wait until the
//!   remote build reports it ready)
//! - Backfill missing embedding fields in fixed-size batches
//! - Retrieve top-K context for a textual query, with optional generation
//!
//! The design is flat (no deep nesting) and splits responsibilities into
//! focused modules.

mod backfill;
mod config;
mod errors;
mod extract;
mod index_admin;
mod mongo_facade;
mod remove;
mod retrieve;

pub use config::{EmbeddingSpec, SimilarityKind, StoreConfig};
pub use errors::StoreError;
pub use extract::shallow_extract;
pub use index_admin::{EnsureOutcome, IndexSpec, ReadyState, VectorFieldSpec};
pub use retrieve::{GENERATION_FAILED, NO_CONTEXT, SearchHit};

use std::time::Duration;

use ai_embed_service::{OllamaService, VoyageService};
use tracing::trace;

/// High-level facade that wires configuration and the database client.
///
/// This is the single entry point recommended for application code.
pub struct VectorStore {
    cfg: StoreConfig,
    db: mongo_facade::MongoFacade,
}

impl VectorStore {
    /// Validates the configuration and connects the database client.
    ///
    /// # Errors
    /// Returns `StoreError::Config` on invalid configuration and
    /// `StoreError::Auth`/`StoreError::Database` on connection failures.
    pub async fn connect(cfg: StoreConfig) -> Result<Self, StoreError> {
        trace!("VectorStore::connect collection={}", cfg.collection);
        cfg.validate()?;
        let db = mongo_facade::MongoFacade::connect(&cfg).await?;
        Ok(Self { cfg, db })
    }

    /// Confirms the deployment is reachable.
    ///
    /// # Errors
    /// Returns `StoreError::Auth` on credential rejection, other database
    /// errors otherwise.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.db.ping().await
    }

    /// Ensures the configured vector-search index exists and matches the
    /// configured field specs. See [`EnsureOutcome`].
    ///
    /// # Errors
    /// Returns database errors; authentication failures are distinct.
    pub async fn ensure_index(&self) -> Result<EnsureOutcome, StoreError> {
        let spec = IndexSpec::from_config(&self.cfg);
        index_admin::ensure_index(&self.db, &spec).await
    }

    /// Polls until the configured index reports ready, using the configured
    /// interval and timeout. Returns `false` on timeout without raising.
    ///
    /// # Errors
    /// Returns database errors raised while polling.
    pub async fn wait_until_ready(&self) -> Result<bool, StoreError> {
        self.wait_until_ready_for(self.cfg.poll_interval, self.cfg.poll_timeout)
            .await
    }

    /// Same as [`VectorStore::wait_until_ready`] with explicit bounds.
    pub async fn wait_until_ready_for(
        &self,
        interval: Duration,
        timeout: Duration,
    ) -> Result<bool, StoreError> {
        index_admin::wait_until_ready(&self.db, &self.cfg.index_name, interval, timeout).await
    }

    /// Backfills every configured embedding field; returns documents
    /// submitted for update.
    ///
    /// # Errors
    /// Fatal on exhausted embedding retries or scan failures; rejected bulk
    /// writes only degrade their own batch.
    pub async fn backfill(&self, embedder: &VoyageService) -> Result<u64, StoreError> {
        backfill::backfill_all(&self.cfg, &self.db, embedder).await
    }

    /// Retrieves merged, deduplicated hits for a textual query.
    ///
    /// # Errors
    /// Fatal if the query embedding fails; per-field search failures are
    /// logged and skipped.
    pub async fn retrieve(
        &self,
        embedder: &VoyageService,
        query: &str,
    ) -> Result<Vec<SearchHit>, StoreError> {
        retrieve::retrieve(&self.cfg, &self.db, embedder, query).await
    }

    /// Generates an answer grounded in the given hits; failures degrade to
    /// the [`GENERATION_FAILED`] sentinel.
    pub async fn answer(
        &self,
        generator: &OllamaService,
        query: &str,
        hits: &[SearchHit],
    ) -> String {
        retrieve::answer(&self.cfg, generator, query, hits).await
    }

    /// Removes every configured embedding field; returns documents modified.
    ///
    /// # Errors
    /// Returns database errors from the counting pass; per-field removal
    /// failures are logged and the rest proceed.
    pub async fn remove_embedding_fields(&self) -> Result<u64, StoreError> {
        remove::remove_all(&self.cfg, &self.db).await
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }
}
