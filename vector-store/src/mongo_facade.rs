//! Thin adapter around the `mongodb` driver to isolate API usage.
//!
//! This facade concentrates all database interactions behind a minimal API,
//! hiding away the driver's builder pattern and keeping the rest of the
//! library decoupled from `mongodb`. Every method classifies driver errors so
//! authentication rejections surface as [`StoreError::Auth`].

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::{UpdateOneModel, WriteModel};
use mongodb::{Client, Collection, Cursor, Namespace, SearchIndexModel, SearchIndexType};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::errors::StoreError;

/// A facade over the driver to keep the rest of the code clean and stable.
///
/// Encapsulates the client plus the target database/collection names; one
/// collection handle is the only shared resource of the whole tooling.
pub struct MongoFacade {
    client: Client,
    database: String,
    collection: String,
}

impl MongoFacade {
    /// Connects to the deployment named in the config.
    ///
    /// The driver connects lazily; use [`MongoFacade::ping`] to force a
    /// round-trip before doing real work.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&cfg.uri)
            .await
            .map_err(StoreError::from_db)?;
        info!(
            "Connected client for collection {}.{}",
            cfg.database, cfg.collection
        );
        Ok(Self {
            client,
            database: cfg.database.clone(),
            collection: cfg.collection.clone(),
        })
    }

    fn coll(&self) -> Collection<Document> {
        self.client
            .database(&self.database)
            .collection::<Document>(&self.collection)
    }

    /// Confirms the deployment is reachable with a `ping` round-trip.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(StoreError::from_db)?;
        info!("Deployment reachable (ping ok)");
        Ok(())
    }

    /// Counts documents matching `filter`.
    pub async fn count(&self, filter: Document) -> Result<u64, StoreError> {
        self.coll()
            .count_documents(filter)
            .await
            .map_err(StoreError::from_db)
    }

    /// Opens a projected scan cursor over documents matching `filter`.
    pub async fn find_projected(
        &self,
        filter: Document,
        projection: Document,
    ) -> Result<Cursor<Document>, StoreError> {
        self.coll()
            .find(filter)
            .projection(projection)
            .await
            .map_err(StoreError::from_db)
    }

    /// Writes one batch of embeddings with a single **unordered** bulk update.
    ///
    /// Each update sets the embedding vector plus provenance metadata (model
    /// identifier and UTC timestamp) on the document matched by `_id`.
    /// Returns the number of documents the server reports as modified.
    pub async fn bulk_set_embeddings(
        &self,
        updates: Vec<(Bson, Vec<f32>)>,
        target_field: &str,
        model: &str,
    ) -> Result<u64, StoreError> {
        if updates.is_empty() {
            debug!("No updates provided for bulk write");
            return Ok(0);
        }

        let ns = Namespace::new(self.database.clone(), self.collection.clone());
        let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut models = Vec::with_capacity(updates.len());
        for (id, vector) in updates {
            let mut set = Document::new();
            set.insert(target_field, vector);
            set.insert("embedding_model", model);
            set.insert("embedding_updated_at", stamp.clone());

            models.push(WriteModel::UpdateOne(
                UpdateOneModel::builder()
                    .namespace(ns.clone())
                    .filter(doc! { "_id": id })
                    .update(doc! { "$set": set })
                    .build(),
            ));
        }

        let res = self
            .client
            .bulk_write(models)
            .ordered(false)
            .await
            .map_err(StoreError::from_db)?;

        debug!("Bulk write modified {} documents", res.modified_count);
        Ok(res.modified_count as u64)
    }

    /// Removes `field` from every document matching `filter` with `$unset`.
    pub async fn unset_field(&self, filter: Document, field: &str) -> Result<u64, StoreError> {
        let mut unset = Document::new();
        unset.insert(field, "");
        let res = self
            .coll()
            .update_many(filter, doc! { "$unset": unset })
            .await
            .map_err(StoreError::from_db)?;
        Ok(res.modified_count)
    }

    /// Runs one `$vectorSearch` aggregation against the named index/path.
    ///
    /// Projects `_id`, the requested display fields, and the similarity score
    /// under `score`.
    pub async fn vector_search(
        &self,
        index: &str,
        path: &str,
        query_vector: &[f32],
        num_candidates: u32,
        limit: usize,
        display_fields: &[String],
    ) -> Result<Vec<Document>, StoreError> {
        let mut projection = doc! {
            "_id": 1,
            "score": { "$meta": "vectorSearchScore" },
        };
        for f in display_fields {
            projection.insert(f, 1);
        }

        let pipeline = vec![
            doc! {
                "$vectorSearch": {
                    "index": index,
                    "path": path,
                    "queryVector": query_vector.to_vec(),
                    "numCandidates": num_candidates as i32,
                    "limit": limit as i32,
                }
            },
            doc! { "$project": projection },
        ];

        let cursor = self
            .coll()
            .aggregate(pipeline)
            .await
            .map_err(StoreError::from_db)?;
        cursor.try_collect().await.map_err(StoreError::from_db)
    }

    /// Lists all search index definitions on the collection.
    pub async fn list_search_indexes(&self) -> Result<Vec<Document>, StoreError> {
        let cursor = self
            .coll()
            .list_search_indexes()
            .await
            .map_err(StoreError::from_db)?;
        cursor.try_collect().await.map_err(StoreError::from_db)
    }

    /// Creates a vector-search index from `definition`.
    pub async fn create_search_index(
        &self,
        name: &str,
        definition: Document,
    ) -> Result<String, StoreError> {
        let model = SearchIndexModel::builder()
            .name(name.to_string())
            .index_type(SearchIndexType::VectorSearch)
            .definition(definition)
            .build();
        self.coll()
            .create_search_index(model)
            .await
            .map_err(StoreError::from_db)
    }

    /// Replaces the definition of an existing search index.
    pub async fn update_search_index(
        &self,
        name: &str,
        definition: Document,
    ) -> Result<(), StoreError> {
        self.coll()
            .update_search_index(name, definition)
            .await
            .map_err(StoreError::from_db)
    }
}
