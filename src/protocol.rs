//! Public protocol structs for HTTP endpoints (serde ready).
//! Field names are camelCase to match the catalog shape the frontend already uses.

use serde::{Deserialize, Serialize};

use crate::domain::Problem;

/// Body of `POST /recommend`.
///
/// The candidate universe comes from exactly one of:
///   - `all`: the full catalog; solved problems are excluded by id
///   - `notDone`: an already-excluded pool, used as-is
///   - neither: the catalog loaded by the server at startup
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendIn {
    #[serde(default)]
    pub done: Vec<Problem>,
    #[serde(default)]
    pub all: Option<Vec<Problem>>,
    #[serde(default)]
    pub not_done: Option<Vec<Problem>>,
    #[serde(default)]
    pub preferred_tag: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendOut {
    pub suggestions: Vec<Problem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub embedder: String,
    pub catalog_size: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
}
