//! Runtime and collection configuration.
//!
//! Built once from the environment at process start and passed by reference
//! into each procedure. Defaults follow the sample-dataset conventions the
//! tooling was written against (`sample_mflix.movies`, `fullplot`).

use std::time::Duration;

use crate::errors::StoreError;

/// Similarity metric used by the vector-search index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimilarityKind {
    /// Cosine similarity (recommended for most embeddings).
    Cosine,
    /// Euclidean distance (L2).
    Euclidean,
    /// Dot product (useful for normalized vectors).
    DotProduct,
}

impl SimilarityKind {
    /// Wire name expected by the index-management API.
    pub fn as_str(self) -> &'static str {
        match self {
            SimilarityKind::Cosine => "cosine",
            SimilarityKind::Euclidean => "euclidean",
            SimilarityKind::DotProduct => "dotProduct",
        }
    }

    /// Parses the metric from its wire name (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityKind::Cosine),
            "euclidean" => Ok(SimilarityKind::Euclidean),
            "dotproduct" => Ok(SimilarityKind::DotProduct),
            other => Err(StoreError::Config(format!(
                "unsupported similarity metric '{other}' (expected cosine, euclidean or dotProduct)"
            ))),
        }
    }
}

/// One source-text field and the embedding field written next to it.
#[derive(Clone, Debug)]
pub struct EmbeddingSpec {
    /// Dot-separated path of the text field to embed (e.g., `fullplot`,
    /// `data.activity`).
    pub source_path: String,
    /// Name of the sibling embedding field (e.g., `fullplot_embedding`).
    pub target_field: String,
}

/// Configuration for index management, backfill and retrieval.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Database connection string.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
    /// Vector-search index name.
    pub index_name: String,
    /// Source-path / embedding-field pairs.
    pub specs: Vec<EmbeddingSpec>,
    /// Declared dimensionality of all embedding fields in the index.
    pub dimensions: u32,
    /// Similarity metric of the index.
    pub similarity: SimilarityKind,
    /// Backfill batch size.
    pub batch_size: usize,
    /// Result limit for retrieval.
    pub limit: usize,
    /// Approximate-search candidate pool size.
    pub num_candidates: u32,
    /// Fields projected into retrieval hits and the generation context.
    pub display_fields: Vec<String>,
    /// Fixed sleep between index-readiness polls.
    pub poll_interval: Duration,
    /// Wall-clock bound on the index-readiness wait.
    pub poll_timeout: Duration,
}

impl StoreConfig {
    /// Builds the config from the environment.
    ///
    /// # Errors
    /// Returns `StoreError::Config` when `MONGODB_URI` is missing, numeric
    /// variables fail to parse, or `EMBEDDING_PATHS`/`EMBEDDING_NAMES` have
    /// different lengths.
    pub fn from_env() -> Result<Self, StoreError> {
        let uri = must_env("MONGODB_URI")?;
        let database = env_or("DB_NAME", "sample_mflix");
        let collection = env_or("COLL_NAME", "movies");
        let index_name = env_or("INDEX_NAME", "vector_index");

        let paths = split_csv(&env_or("EMBEDDING_PATHS", ""));
        let names = split_csv(&env_or("EMBEDDING_NAMES", ""));
        let specs = pair_specs(paths, names)?;

        let dimensions = env_parse("NUM_DIMENSIONS", 1024u32)?;
        let similarity = SimilarityKind::parse(&env_or("SIMILARITY", "cosine"))?;
        let batch_size = env_parse("BATCH_SIZE", 10usize)?;
        let limit = env_parse("SEARCH_LIMIT", 3usize)?;
        let num_candidates = env_parse("NUM_CANDIDATES", 150u32)?;

        let mut display_fields = split_csv(&env_or("EMBEDDING_FIELDS", ""));
        if display_fields.is_empty() {
            display_fields = vec!["title".to_string(), "fullplot".to_string()];
        }

        let poll_interval = Duration::from_secs(env_parse("POLL_INTERVAL_SECS", 10u64)?);
        let poll_timeout = Duration::from_secs(env_parse("POLL_TIMEOUT_SECS", 300u64)?);

        let cfg = Self {
            uri,
            database,
            collection,
            index_name,
            specs,
            dimensions,
            similarity,
            batch_size,
            limit,
            num_candidates,
            display_fields,
            poll_interval,
            poll_timeout,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.uri.trim().is_empty() {
            return Err(StoreError::Config("connection string is empty".into()));
        }
        if self.database.trim().is_empty() || self.collection.trim().is_empty() {
            return Err(StoreError::Config("database/collection is empty".into()));
        }
        if self.index_name.trim().is_empty() {
            return Err(StoreError::Config("index name is empty".into()));
        }
        if self.specs.is_empty() {
            return Err(StoreError::Config("no embedding fields configured".into()));
        }
        if self.batch_size == 0 {
            return Err(StoreError::Config("batch_size must be > 0".into()));
        }
        if self.dimensions == 0 {
            return Err(StoreError::Config("dimensions must be > 0".into()));
        }
        Ok(())
    }
}

/// Pairs source paths with target field names, defaulting to the single
/// `fullplot` → `fullplot_embedding` pair when both lists are empty.
pub(crate) fn pair_specs(
    paths: Vec<String>,
    names: Vec<String>,
) -> Result<Vec<EmbeddingSpec>, StoreError> {
    if paths.is_empty() && names.is_empty() {
        return Ok(vec![EmbeddingSpec {
            source_path: "fullplot".to_string(),
            target_field: "fullplot_embedding".to_string(),
        }]);
    }
    if paths.len() != names.len() {
        return Err(StoreError::Config(format!(
            "EMBEDDING_PATHS and EMBEDDING_NAMES must have equal length (got {} and {})",
            paths.len(),
            names.len()
        )));
    }
    Ok(paths
        .into_iter()
        .zip(names)
        .map(|(source_path, target_field)| EmbeddingSpec {
            source_path,
            target_field,
        })
        .collect())
}

/// Splits a comma-separated list, trimming entries and dropping empties.
pub(crate) fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn must_env(name: &str) -> Result<String, StoreError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StoreError::Config(format!(
            "missing required environment variable: {name}"
        ))),
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, StoreError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse::<T>().map_err(|_| {
            StoreError::Config(format!("invalid number in {name}: '{v}'"))
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_split_trims_and_drops_empties() {
        let got = split_csv(" fullplot , data.activity ,, ");
        assert_eq!(got, vec!["fullplot", "data.activity"]);
        assert!(split_csv("").is_empty());
    }

    #[test]
    fn similarity_parse_is_case_insensitive() {
        assert_eq!(
            SimilarityKind::parse("dotProduct").unwrap(),
            SimilarityKind::DotProduct
        );
        assert_eq!(
            SimilarityKind::parse("COSINE").unwrap(),
            SimilarityKind::Cosine
        );
        assert!(SimilarityKind::parse("manhattan").is_err());
    }

    #[test]
    fn unpaired_field_lists_are_rejected() {
        let err = pair_specs(
            vec!["fullplot".into(), "plot".into()],
            vec!["fullplot_embedding".into()],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn empty_lists_default_to_fullplot_pair() {
        let specs = pair_specs(Vec::new(), Vec::new()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].source_path, "fullplot");
        assert_eq!(specs[0].target_field, "fullplot_embedding");
    }
}
