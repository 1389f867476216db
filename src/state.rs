//! Application state: the recommender (with its embedding backend) and the server-side catalog.
//!
//! Everything here is built once at startup and only read afterwards, so the
//! state is shared between requests behind a plain `Arc` without locks.
//!
//! The embedding backend is the OpenAI embeddings API when OPENAI_API_KEY is
//! set; otherwise the offline hashing embedder is used.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::config::{load_catalog, load_service_config_from_env, ServiceConfig};
use crate::domain::Problem;
use crate::embedding::{Embedder, HashingEmbedder};
use crate::openai::OpenAiEmbedder;
use crate::recommender::Recommender;

pub struct AppState {
    pub recommender: Recommender,
    pub catalog: Vec<Problem>,
}

impl AppState {
    /// Build state from env: load config, pick the embedding backend, load the catalog.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_service_config_from_env().unwrap_or_default();

        let embedder: Arc<dyn Embedder> = match OpenAiEmbedder::from_env() {
            Some(oa) => {
                info!(target: "problem_recommender", base_url = %oa.base_url, model = %oa.model, "OpenAI embeddings enabled.");
                Arc::new(oa)
            }
            None => {
                info!(target: "problem_recommender", dimensions = cfg.embedding.dimensions, "OpenAI disabled (no OPENAI_API_KEY). Using local hashing embedder.");
                Arc::new(HashingEmbedder::new(cfg.embedding.dimensions))
            }
        };

        let catalog = catalog_from_config(&cfg);
        info!(target: "problem_recommender", catalog_size = catalog.len(), top_k = cfg.ranking.top_k, "Startup catalog inventory");

        Self::with_parts(Recommender::new(embedder, cfg.ranking), catalog)
    }

    pub fn with_parts(recommender: Recommender, catalog: Vec<Problem>) -> Self {
        Self { recommender, catalog: dedup_by_id(catalog) }
    }
}

/// CATALOG_PATH wins over `catalog_path` from TOML. Load failures leave the catalog empty.
fn catalog_from_config(cfg: &ServiceConfig) -> Vec<Problem> {
    let Some(path) = std::env::var("CATALOG_PATH").ok().or_else(|| cfg.catalog_path.clone()) else {
        info!(target: "problem_recommender", "No catalog configured; requests must carry their own candidates.");
        return Vec::new();
    };
    match load_catalog(&path) {
        Ok(problems) => {
            info!(target: "problem_recommender", %path, count = problems.len(), "Loaded problem catalog");
            problems
        }
        Err(e) => {
            error!(target: "problem_recommender", %path, error = %e, "Failed to load problem catalog");
            Vec::new()
        }
    }
}

/// First occurrence of an id wins.
fn dedup_by_id(problems: Vec<Problem>) -> Vec<Problem> {
    let mut seen = HashSet::new();
    problems
        .into_iter()
        .filter(|p| {
            let fresh = seen.insert(p.frontend_question_id);
            if !fresh {
                warn!(target: "problem_recommender", id = p.frontend_question_id, slug = %p.title_slug, "Dropping duplicate catalog entry");
            }
            fresh
        })
        .collect()
}
