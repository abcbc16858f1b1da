//! Retrieval and generation: embed the query once, search every configured
//! embedding field, merge the ranked hits, and optionally ask a local model
//! for an answer grounded in the retrieved context.

use std::cmp::Ordering;

use mongodb::bson::Bson;
use tracing::{info, warn};

use ai_embed_service::{OllamaService, VoyageService};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::extract::render_value;
use crate::mongo_facade::MongoFacade;

/// Sentinel answer returned when the generation call fails.
pub const GENERATION_FAILED: &str = "Error during generation.";

/// Answer returned when retrieval produced nothing to ground on.
pub const NO_CONTEXT: &str = "No relevant documents found to generate an answer.";

/// Upper bound on the generation context, in characters.
const MAX_CONTEXT_CHARS: usize = 6000;

/// A single retrieval hit.
#[derive(Clone, Debug)]
pub struct SearchHit {
    /// Opaque document identity.
    pub id: Bson,
    /// Similarity score reported by the search.
    pub score: f64,
    /// Which embedding field produced the hit.
    pub search_field: String,
    /// Projected document (display fields only).
    pub doc: mongodb::bson::Document,
}

/// Embeds `query` once and searches every configured embedding field,
/// returning merged, deduplicated hits truncated to the configured limit.
///
/// A failed search on one field is logged and skipped; the remaining fields
/// still run.
pub async fn retrieve(
    cfg: &StoreConfig,
    db: &MongoFacade,
    embedder: &VoyageService,
    query: &str,
) -> Result<Vec<SearchHit>, StoreError> {
    info!("Embedding query: {query}");
    let query_vector = embedder.embed_one(query).await?;

    let mut all: Vec<SearchHit> = Vec::new();
    for spec in &cfg.specs {
        info!(
            "Searching index '{}' on field '{}'",
            cfg.index_name, spec.target_field
        );
        match db
            .vector_search(
                &cfg.index_name,
                &spec.target_field,
                &query_vector,
                cfg.num_candidates,
                cfg.limit,
                &cfg.display_fields,
            )
            .await
        {
            Ok(docs) => {
                for doc in docs {
                    all.push(SearchHit {
                        id: doc.get("_id").cloned().unwrap_or(Bson::Null),
                        score: doc.get_f64("score").unwrap_or(0.0),
                        search_field: spec.target_field.clone(),
                        doc,
                    });
                }
            }
            Err(e) => {
                warn!(
                    "Vector search failed for field '{}': {e}",
                    spec.target_field
                );
            }
        }
    }

    if all.is_empty() {
        warn!("No results found across any embedding fields");
    }
    Ok(merge_hits(all, cfg.limit))
}

/// Sorts by descending score, deduplicates by document identity keeping the
/// first (highest-scoring) occurrence, and truncates to `limit`.
pub fn merge_hits(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut seen: Vec<Bson> = Vec::new();
    let mut out: Vec<SearchHit> = Vec::new();
    for hit in hits {
        if seen.contains(&hit.id) {
            continue;
        }
        seen.push(hit.id.clone());
        out.push(hit);
        if out.len() >= limit {
            break;
        }
    }
    out
}

/// Generates an answer grounded in the retrieved hits.
///
/// A generation failure is downgraded to the fixed [`GENERATION_FAILED`]
/// sentinel rather than an error; an empty hit list short-circuits to
/// [`NO_CONTEXT`].
pub async fn answer(
    cfg: &StoreConfig,
    generator: &OllamaService,
    query: &str,
    hits: &[SearchHit],
) -> String {
    if hits.is_empty() {
        return NO_CONTEXT.to_string();
    }

    let context = build_context(hits, &cfg.display_fields, MAX_CONTEXT_CHARS);
    let prompt = format!(
        "You are a helpful assistant that answers questions based on the provided \
         document context.\n\nContext:\n{context}\n\nQuestion: {query}\n\n\
         Provide a concise, factual answer (3-6 sentences).\n"
    );

    info!("Sending context to local model '{}'", generator.model());
    match generator.generate(&prompt).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Generation failed: {e}");
            GENERATION_FAILED.to_string()
        }
    }
}

/// Flattens display-field values from the hits into a bounded text block.
fn build_context(hits: &[SearchHit], fields: &[String], max_chars: usize) -> String {
    let mut chunks: Vec<String> = Vec::new();
    for hit in hits {
        for field in fields {
            if let Some(value) = hit.doc.get(field) {
                let text = render_value(value);
                if !text.is_empty() {
                    chunks.push(format!("{field}: {text}"));
                }
            }
        }
    }
    clamp_chars(&chunks.join("\n"), max_chars)
}

/// Truncates to at most `max_chars` characters on a char boundary.
fn clamp_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn hit(id: i32, score: f64, field: &str) -> SearchHit {
        SearchHit {
            id: Bson::Int32(id),
            score,
            search_field: field.to_string(),
            doc: doc! { "_id": id, "title": format!("doc-{id}") },
        }
    }

    #[test]
    fn duplicate_identity_keeps_higher_score() {
        let merged = merge_hits(
            vec![
                hit(1, 0.70, "a_embedding"),
                hit(2, 0.60, "a_embedding"),
                hit(1, 0.90, "b_embedding"),
            ],
            5,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, Bson::Int32(1));
        assert_eq!(merged[0].score, 0.90);
        assert_eq!(merged[0].search_field, "b_embedding");
        assert_eq!(merged[1].id, Bson::Int32(2));
    }

    #[test]
    fn merged_hits_are_sorted_and_truncated() {
        let merged = merge_hits(
            vec![
                hit(1, 0.10, "a"),
                hit(2, 0.50, "a"),
                hit(3, 0.30, "a"),
                hit(4, 0.40, "a"),
            ],
            2,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, Bson::Int32(2));
        assert_eq!(merged[1].id, Bson::Int32(4));
    }

    #[test]
    fn context_is_bounded_and_labelled() {
        let hits = vec![SearchHit {
            id: Bson::Int32(1),
            score: 0.9,
            search_field: "a".into(),
            doc: doc! { "title": "Big Fish", "fullplot": "x".repeat(100) },
        }];
        let ctx = build_context(
            &hits,
            &["title".to_string(), "fullplot".to_string()],
            40,
        );
        assert!(ctx.starts_with("title: Big Fish"));
        assert_eq!(ctx.chars().count(), 40);
    }
}
