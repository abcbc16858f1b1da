//! Embedding backfill: scan documents missing an embedding field, embed their
//! source text in fixed-size batches, and bulk-write the vectors back.
//!
//! Field presence is the sole completion marker, so a rerun only touches
//! documents the previous run missed. A failed bulk write degrades that one
//! batch and the run continues; an exhausted embedding retry aborts the run.

use futures::TryStreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use mongodb::bson::{Bson, Document, doc};
use tracing::{debug, info, warn};

use ai_embed_service::VoyageService;

use crate::config::{EmbeddingSpec, StoreConfig};
use crate::errors::StoreError;
use crate::extract::shallow_extract;
use crate::mongo_facade::MongoFacade;

/// Backfills every configured embedding field in turn.
///
/// Returns the total number of documents submitted for update across fields.
pub async fn backfill_all(
    cfg: &StoreConfig,
    db: &MongoFacade,
    embedder: &VoyageService,
) -> Result<u64, StoreError> {
    let mut total = 0u64;
    for spec in &cfg.specs {
        info!(
            "Backfilling '{}' from '{}'",
            spec.target_field, spec.source_path
        );
        total += backfill_field(cfg, db, embedder, spec).await?;
    }
    Ok(total)
}

/// Backfills one source-path/target-field pair.
pub async fn backfill_field(
    cfg: &StoreConfig,
    db: &MongoFacade,
    embedder: &VoyageService,
    spec: &EmbeddingSpec,
) -> Result<u64, StoreError> {
    let filter = missing_filter(&spec.source_path, &spec.target_field);
    let total = db.count(filter.clone()).await?;
    info!(
        "Found {} documents missing '{}'",
        total, spec.target_field
    );
    if total == 0 {
        return Ok(0);
    }

    let mut projection = doc! { "_id": 1 };
    projection.insert(&spec.source_path, 1);
    let mut cursor = db.find_projected(filter, projection).await?;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap()
        .progress_chars("##-"),
    );

    let mut batcher = Batcher::new(cfg.batch_size);
    let mut submitted = 0u64;

    while let Some(document) = cursor.try_next().await.map_err(StoreError::from_db)? {
        if let Some(batch) = batcher.push(document) {
            let n = batch.len() as u64;
            submitted += flush_batch(db, embedder, spec, batch).await?;
            pb.inc(n);
        }
    }
    if let Some(batch) = batcher.finish() {
        let n = batch.len() as u64;
        submitted += flush_batch(db, embedder, spec, batch).await?;
        pb.inc(n);
    }

    pb.finish_with_message("backfill complete");
    info!(
        "Submitted {} of {} documents for '{}'",
        submitted, total, spec.target_field
    );
    Ok(submitted)
}

/// Embeds one batch and issues its unordered bulk write.
///
/// Embedding-call exhaustion is fatal and propagates; a rejected bulk write is
/// logged and tolerated so the remaining batches still run.
async fn flush_batch(
    db: &MongoFacade,
    embedder: &VoyageService,
    spec: &EmbeddingSpec,
    batch: Vec<Document>,
) -> Result<u64, StoreError> {
    let texts: Vec<String> = batch
        .iter()
        .map(|d| shallow_extract(d, &spec.source_path))
        .collect();
    let vectors = embedder.embed_batch(&texts).await?;

    let updates: Vec<(Bson, Vec<f32>)> = batch
        .iter()
        .map(|d| d.get("_id").cloned().unwrap_or(Bson::Null))
        .zip(vectors)
        .collect();
    let count = updates.len() as u64;

    match db
        .bulk_set_embeddings(updates, &spec.target_field, embedder.model())
        .await
    {
        Ok(modified) => {
            debug!("Updated {} documents in batch of {}", modified, count);
            Ok(count)
        }
        Err(e) => {
            warn!("Bulk write failed for batch of {}: {e}", count);
            Ok(0)
        }
    }
}

/// Scan predicate: source field present AND target field absent. Dotted
/// source paths (array-of-subdocuments shape) match via `$elemMatch` on the
/// first path segment.
pub(crate) fn missing_filter(source_path: &str, target_field: &str) -> Document {
    let mut filter = Document::new();
    if let Some((head, rest)) = source_path.split_once('.') {
        let mut elem = Document::new();
        elem.insert(rest, doc! { "$exists": true });
        filter.insert(head, doc! { "$elemMatch": elem });
    } else {
        filter.insert(source_path, doc! { "$exists": true });
    }
    filter.insert(target_field, doc! { "$exists": false });
    filter
}

/// Fixed-capacity accumulator; `push` hands back a full batch at the
/// threshold, `finish` hands back the final partial batch.
pub(crate) struct Batcher<T> {
    cap: usize,
    buf: Vec<T>,
}

impl<T> Batcher<T> {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            buf: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.buf.push(item);
        if self.buf.len() >= self.cap {
            Some(std::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    pub(crate) fn finish(self) -> Option<Vec<T>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_exactly_at_batch_boundaries() {
        // 2*batch_size + 3 items must produce exactly 3 flushes: full, full,
        // and a final partial of 3.
        let batch_size = 10usize;
        let mut batcher = Batcher::new(batch_size);
        let mut flushes: Vec<usize> = Vec::new();

        for i in 0..(batch_size * 2 + 3) {
            if let Some(batch) = batcher.push(i) {
                flushes.push(batch.len());
            }
        }
        if let Some(batch) = batcher.finish() {
            flushes.push(batch.len());
        }

        assert_eq!(flushes, vec![batch_size, batch_size, 3]);
    }

    #[test]
    fn no_final_flush_when_everything_fit() {
        let mut batcher = Batcher::new(2);
        assert!(batcher.push(1).is_none());
        assert!(batcher.push(2).is_some());
        assert!(batcher.finish().is_none());
    }

    #[test]
    fn top_level_filter_requires_source_and_excludes_done() {
        let f = missing_filter("fullplot", "fullplot_embedding");
        assert_eq!(
            f.get_document("fullplot").unwrap(),
            &doc! { "$exists": true }
        );
        assert_eq!(
            f.get_document("fullplot_embedding").unwrap(),
            &doc! { "$exists": false }
        );
    }

    #[test]
    fn dotted_filter_uses_elem_match_on_head() {
        let f = missing_filter("data.activity", "activity_embedding");
        assert_eq!(
            f.get_document("data").unwrap(),
            &doc! { "$elemMatch": { "activity": { "$exists": true } } }
        );
        assert_eq!(
            f.get_document("activity_embedding").unwrap(),
            &doc! { "$exists": false }
        );
    }
}
