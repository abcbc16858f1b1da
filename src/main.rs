//! Entry point for the embedding lifecycle tooling.
//!
//! Each subcommand is one standalone, single-pass procedure:
//!
//! - `ensure-index [--wait]`  create/update the vector-search index
//! - `backfill`               compute and write missing embeddings
//! - `search <query...>`      similarity search only
//! - `ask <query...>`         similarity search + generated answer
//! - `remove-embeddings`      unset the configured embedding fields
//!
//! Exits 0 on success and 1 on any fatal condition (missing configuration,
//! authentication failure, exhausted retries, readiness timeout).

use std::error::Error;

use ai_embed_service::{
    EmbedModelConfig, GenModelConfig, OllamaService, RetryPolicy, VoyageService,
};
use tracing_subscriber::EnvFilter;
use vector_store::{StoreConfig, VectorStore};

const DEFAULT_QUERY: &str = "What movies are about an animal trying to accomplish something great?";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env if present; CI and containers
    // inject the environment directly, so a missing file is not an error.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let command = match args.next() {
        Some(c) => c,
        None => {
            print_usage();
            std::process::exit(1);
        }
    };
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "ensure-index" => ensure_index(rest.iter().any(|a| a == "--wait")).await?,
        "backfill" => backfill().await?,
        "search" => search(join_query(&rest)).await?,
        "ask" => ask(join_query(&rest)).await?,
        "remove-embeddings" => remove_embeddings().await?,
        other => {
            eprintln!("unknown command: {other}");
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_usage() {
    eprintln!(
        "usage: vector-ops <command>\n\n\
         commands:\n  \
         ensure-index [--wait]   create or update the vector-search index\n  \
         backfill                embed documents missing embedding fields\n  \
         search <query...>       similarity search\n  \
         ask <query...>          similarity search + generated answer\n  \
         remove-embeddings       unset the configured embedding fields"
    );
}

fn join_query(rest: &[String]) -> String {
    let words: Vec<&str> = rest
        .iter()
        .map(String::as_str)
        .filter(|w| !w.starts_with("--"))
        .collect();
    if words.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        words.join(" ")
    }
}

async fn connect() -> Result<VectorStore, Box<dyn Error>> {
    let cfg = StoreConfig::from_env()?;
    Ok(VectorStore::connect(cfg).await?)
}

fn embedder() -> Result<VoyageService, Box<dyn Error>> {
    let cfg = EmbedModelConfig::from_env()?;
    Ok(VoyageService::new(cfg, RetryPolicy::default())?)
}

async fn ensure_index(wait: bool) -> Result<(), Box<dyn Error>> {
    let store = connect().await?;
    store.ping().await?;

    let outcome = store.ensure_index().await?;
    tracing::info!("ensure-index outcome: {:?}", outcome);

    if wait {
        let ready = store.wait_until_ready().await?;
        if !ready {
            tracing::error!("index did not become ready within the configured timeout");
            std::process::exit(1);
        }
        tracing::info!("index is ready");
    }
    Ok(())
}

async fn backfill() -> Result<(), Box<dyn Error>> {
    let store = connect().await?;
    let embedder = embedder()?;
    let submitted = store.backfill(&embedder).await?;
    tracing::info!("backfill complete: {} documents submitted", submitted);
    Ok(())
}

async fn search(query: String) -> Result<(), Box<dyn Error>> {
    let store = connect().await?;
    let embedder = embedder()?;
    let hits = store.retrieve(&embedder, &query).await?;

    if hits.is_empty() {
        println!("no results — check the vector index or field mapping");
        return Ok(());
    }
    for hit in &hits {
        let label = store
            .config()
            .display_fields
            .iter()
            .find_map(|f| hit.doc.get_str(f).ok())
            .unwrap_or("Unknown");
        println!(
            "- {label} (score: {:.4}, from: {})",
            hit.score, hit.search_field
        );
    }
    Ok(())
}

async fn ask(query: String) -> Result<(), Box<dyn Error>> {
    let store = connect().await?;
    let embedder = embedder()?;
    let generator = OllamaService::new(GenModelConfig::from_env()?)?;

    let hits = store.retrieve(&embedder, &query).await?;
    let answer = store.answer(&generator, &query, &hits).await;
    println!("{answer}");
    Ok(())
}

async fn remove_embeddings() -> Result<(), Box<dyn Error>> {
    let store = connect().await?;
    let modified = store.remove_embedding_fields().await?;
    tracing::info!("removed embedding fields from {} documents", modified);
    Ok(())
}
