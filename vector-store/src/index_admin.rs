//! Vector-search index administration: ensure a definition exists and matches
//! the desired field specs, and wait for the remote build to report ready.
//!
//! Index builds are asynchronous on the remote side; the only wait construct
//! here is a fixed-interval poll bounded by a wall-clock deadline. Timing out
//! is reported as `false`, not an error, so the caller decides whether that is
//! fatal.

use std::future::Future;
use std::time::Duration;

use mongodb::bson::{Bson, Document, doc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{SimilarityKind, StoreConfig};
use crate::errors::StoreError;
use crate::mongo_facade::MongoFacade;

/// One vector field declared by the index.
#[derive(Clone, Debug)]
pub struct VectorFieldSpec {
    /// Document path of the embedding field.
    pub path: String,
    /// Declared dimensionality.
    pub dimensions: u32,
    /// Similarity metric.
    pub similarity: SimilarityKind,
}

impl VectorFieldSpec {
    fn to_document(&self) -> Document {
        doc! {
            "type": "vector",
            "path": &self.path,
            "numDimensions": self.dimensions as i32,
            "similarity": self.similarity.as_str(),
        }
    }
}

/// Desired shape of one named vector-search index.
#[derive(Clone, Debug)]
pub struct IndexSpec {
    /// Index name, unique per collection.
    pub name: String,
    /// Declared vector fields.
    pub fields: Vec<VectorFieldSpec>,
}

impl IndexSpec {
    /// One vector field per configured embedding field, all sharing the
    /// configured dimensionality and metric.
    pub fn from_config(cfg: &StoreConfig) -> Self {
        Self {
            name: cfg.index_name.clone(),
            fields: cfg
                .specs
                .iter()
                .map(|s| VectorFieldSpec {
                    path: s.target_field.clone(),
                    dimensions: cfg.dimensions,
                    similarity: cfg.similarity,
                })
                .collect(),
        }
    }

    /// Remote definition document: `{"fields": [{type, path, numDimensions,
    /// similarity}, ..]}`.
    pub fn definition(&self) -> Document {
        doc! {
            "fields": self
                .fields
                .iter()
                .map(|f| Bson::Document(f.to_document()))
                .collect::<Vec<Bson>>(),
        }
    }
}

/// What `ensure_index` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// No index with that name existed; one was created.
    Created,
    /// The index existed but its fields diverged; the definition was replaced.
    Updated,
    /// The index already matched the desired definition.
    Unchanged,
}

/// Reported build state of one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// The remote reports the index as queryable.
    Ready,
    /// Still building, failed, or not yet visible.
    Pending,
}

/// Ensures the named index exists with the desired field specs.
///
/// Lists existing definitions; creates the index if absent, replaces the
/// definition if the declared fields differ in any way (the comparison is
/// exact and order-sensitive, so any mismatch conservatively triggers an
/// update), and no-ops otherwise.
pub async fn ensure_index(
    db: &MongoFacade,
    spec: &IndexSpec,
) -> Result<EnsureOutcome, StoreError> {
    info!(
        "Ensuring vector index '{}' over {} field(s)",
        spec.name,
        spec.fields.len()
    );

    let desired = spec.definition();
    let existing = db.list_search_indexes().await?;
    let current = existing
        .iter()
        .find(|d| d.get_str("name") == Ok(spec.name.as_str()));

    match current {
        None => {
            info!("Index '{}' not found, creating", spec.name);
            let created = db.create_search_index(&spec.name, desired).await?;
            info!("Created vector index '{}'", created);
            Ok(EnsureOutcome::Created)
        }
        Some(doc) => {
            let current_fields = declared_fields(doc);
            if fields_match(current_fields, desired.get("fields")) {
                info!("Index '{}' already up to date", spec.name);
                Ok(EnsureOutcome::Unchanged)
            } else {
                info!("Index '{}' diverges from desired fields, updating", spec.name);
                db.update_search_index(&spec.name, desired).await?;
                Ok(EnsureOutcome::Updated)
            }
        }
    }
}

/// Waits until the remote reports the named index ready.
///
/// Fixed-interval polling bounded by `timeout`; returns `true` as soon as the
/// status is ready (immediately if it already is on the first poll) and
/// `false` once the deadline passes.
pub async fn wait_until_ready(
    db: &MongoFacade,
    name: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<bool, StoreError> {
    wait_with(interval, timeout, || poll_status(db, name)).await
}

/// One status poll: re-lists the indexes and inspects the reported status.
async fn poll_status(db: &MongoFacade, name: &str) -> Result<ReadyState, StoreError> {
    let indexes = db.list_search_indexes().await?;
    let state = indexes
        .iter()
        .find(|d| d.get_str("name") == Ok(name))
        .map(|d| {
            let status = d.get_str("status").unwrap_or("UNKNOWN");
            debug!("Index '{}' status: {}", name, status);
            if status == "READY" {
                ReadyState::Ready
            } else {
                ReadyState::Pending
            }
        })
        .unwrap_or(ReadyState::Pending);
    Ok(state)
}

/// Deadline-bounded fixed-interval wait over an arbitrary poll source.
///
/// Polls immediately, then sleeps `interval` between polls until `timeout`
/// elapses.
pub(crate) async fn wait_with<F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut poll: F,
) -> Result<bool, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ReadyState, StoreError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if poll().await? == ReadyState::Ready {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            warn!("Index not ready within {:?}", timeout);
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Field list declared by an existing index document, if present.
fn declared_fields(index_doc: &Document) -> Option<&Bson> {
    index_doc
        .get_document("latestDefinition")
        .ok()
        .and_then(|d| d.get("fields"))
}

/// Exact, order-sensitive comparison. The remote API's tolerance for field
/// reordering is unspecified, so any mismatch is treated as divergence.
fn fields_match(current: Option<&Bson>, desired: Option<&Bson>) -> bool {
    match (current, desired) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn spec(paths: &[&str]) -> IndexSpec {
        IndexSpec {
            name: "vector_index".into(),
            fields: paths
                .iter()
                .map(|p| VectorFieldSpec {
                    path: p.to_string(),
                    dimensions: 1024,
                    similarity: SimilarityKind::Cosine,
                })
                .collect(),
        }
    }

    #[test]
    fn definition_has_one_entry_per_field() {
        let def = spec(&["a_embedding", "b_embedding"]).definition();
        let fields = def.get_array("fields").unwrap();
        assert_eq!(fields.len(), 2);
        let first = fields[0].as_document().unwrap();
        assert_eq!(first.get_str("type").unwrap(), "vector");
        assert_eq!(first.get_str("path").unwrap(), "a_embedding");
        assert_eq!(first.get_i32("numDimensions").unwrap(), 1024);
        assert_eq!(first.get_str("similarity").unwrap(), "cosine");
    }

    #[test]
    fn reordered_fields_count_as_divergence() {
        let a = spec(&["a_embedding", "b_embedding"]).definition();
        let b = spec(&["b_embedding", "a_embedding"]).definition();
        assert!(!fields_match(a.get("fields"), b.get("fields")));
        assert!(fields_match(a.get("fields"), a.get("fields")));
    }

    #[test]
    fn missing_declared_fields_count_as_divergence() {
        let a = spec(&["a_embedding"]).definition();
        assert!(!fields_match(None, a.get("fields")));
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_first_poll_returns_true_immediately() {
        let polls = Cell::new(0u32);
        let ok = wait_with(Duration::from_secs(10), Duration::from_secs(60), || {
            polls.set(polls.get() + 1);
            async { Ok::<ReadyState, StoreError>(ReadyState::Ready) }
        })
        .await
        .unwrap();
        assert!(ok);
        assert_eq!(polls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn never_ready_times_out_with_false() {
        let polls = Cell::new(0u32);
        let ok = wait_with(Duration::from_secs(10), Duration::from_secs(35), || {
            polls.set(polls.get() + 1);
            async { Ok::<ReadyState, StoreError>(ReadyState::Pending) }
        })
        .await
        .unwrap();
        assert!(!ok);
        // Polls at t = 0, 10, 20, 30, 40; the poll at 40 sees the deadline passed.
        assert_eq!(polls.get(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_ready_mid_wait() {
        let polls = Cell::new(0u32);
        let ok = wait_with(Duration::from_secs(5), Duration::from_secs(60), || {
            polls.set(polls.get() + 1);
            let n = polls.get();
            async move {
                Ok::<ReadyState, StoreError>(if n >= 3 {
                    ReadyState::Ready
                } else {
                    ReadyState::Pending
                })
            }
        })
        .await
        .unwrap();
        assert!(ok);
        assert_eq!(polls.get(), 3);
    }
}
