//! Removal of embedding fields. Irreversible once acknowledged.

use mongodb::bson::{Document, doc};
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::mongo_facade::MongoFacade;

/// Removes every configured embedding field and returns the total number of
/// documents modified. A failure on one field is logged and the rest proceed.
pub async fn remove_all(cfg: &StoreConfig, db: &MongoFacade) -> Result<u64, StoreError> {
    let mut total = 0u64;
    for spec in &cfg.specs {
        match remove_field(db, &spec.target_field).await {
            Ok(modified) => total += modified,
            Err(e) => warn!("Failed to remove '{}': {e}", spec.target_field),
        }
    }
    info!(
        "Finished cleaning embeddings: {} fields processed, {} documents modified",
        cfg.specs.len(),
        total
    );
    Ok(total)
}

/// Removes one embedding field from all documents holding it.
///
/// Counts first so a no-op is reported cheaply, then issues one `$unset`
/// update: unfiltered for top-level names, filtered by existence for dotted
/// paths. Returns the number of documents modified.
pub async fn remove_field(db: &MongoFacade, name: &str) -> Result<u64, StoreError> {
    let mut exists = Document::new();
    exists.insert(name, doc! { "$exists": true });

    let count = db.count(exists).await?;
    info!("Found {} documents with '{}'", count, name);
    if count == 0 {
        info!("No documents contain '{}', skipping", name);
        return Ok(0);
    }

    let modified = db.unset_field(removal_filter(name), name).await?;
    info!("Removed '{}' from {} documents", name, modified);
    Ok(modified)
}

/// Top-level fields are unset across the whole collection; dotted paths are
/// filtered by existence so the update only touches documents with the path.
pub(crate) fn removal_filter(name: &str) -> Document {
    let mut filter = Document::new();
    if name.contains('.') {
        filter.insert(name, doc! { "$exists": true });
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_removal_is_unfiltered() {
        assert!(removal_filter("fullplot_embedding").is_empty());
    }

    #[test]
    fn dotted_removal_filters_by_existence() {
        let f = removal_filter("data.activity_embedding");
        assert_eq!(
            f.get_document("data.activity_embedding").unwrap(),
            &doc! { "$exists": true }
        );
    }
}
