//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs request sizes and basic result info.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::recommend;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    embedder: state.recommender.embedder_name().to_string(),
    catalog_size: state.catalog.len(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_problems(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<crate::domain::Problem>>, ApiError> {
  if state.catalog.is_empty() {
    return Err(ApiError::NotFound("No problems found".into()));
  }
  info!(target: "problem_recommender", count = state.catalog.len(), "HTTP catalog served");
  Ok(Json(state.catalog.clone()))
}

#[instrument(
  level = "info",
  skip(state, body),
  fields(done = body.done.len(), has_all = body.all.is_some(), has_not_done = body.not_done.is_some())
)]
pub async fn http_post_recommend(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RecommendIn>,
) -> Result<Json<RecommendOut>, ApiError> {
  let suggestions = recommend(&state, body).await?;
  info!(target: "recommender", returned = suggestions.len(), "HTTP recommend served");
  Ok(Json(RecommendOut { suggestions }))
}
