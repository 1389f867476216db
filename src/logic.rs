//! Request-level behavior behind the HTTP handlers.
//!
//! This includes:
//!   - Resolving which problems are candidates (catalog minus solved, or a pre-split pool)
//!   - Clamping the requested top-k
//!   - Calling the recommender

use std::collections::HashSet;

use tracing::{info, instrument};

use crate::domain::Problem;
use crate::error::ApiError;
use crate::protocol::RecommendIn;
use crate::state::AppState;

/// Where the candidate pool comes from.
#[derive(Debug)]
pub enum CandidateSource {
  /// Full catalog sent by the caller; solved problems are removed by id.
  Catalog(Vec<Problem>),
  /// Already excluded by the caller; used as-is.
  NotDone(Vec<Problem>),
  /// The catalog loaded at startup; solved problems are removed by id.
  ServerCatalog,
}

impl CandidateSource {
  pub fn label(&self) -> &'static str {
    match self {
      CandidateSource::Catalog(_) => "request_catalog",
      CandidateSource::NotDone(_) => "not_done",
      CandidateSource::ServerCatalog => "server_catalog",
    }
  }
}

/// Pick the candidate source from a request. Both `all` and `notDone` is ambiguous.
pub fn candidate_source(all: Option<Vec<Problem>>, not_done: Option<Vec<Problem>>) -> Result<CandidateSource, ApiError> {
  match (all, not_done) {
    (Some(_), Some(_)) => Err(ApiError::BadRequest("Provide either `all` or `notDone`, not both".into())),
    (Some(all), None) => Ok(CandidateSource::Catalog(all)),
    (None, Some(nd)) => Ok(CandidateSource::NotDone(nd)),
    (None, None) => Ok(CandidateSource::ServerCatalog),
  }
}

/// Catalog problems whose id is not among the solved ids.
pub fn exclude_solved(done: &[Problem], catalog: &[Problem]) -> Vec<Problem> {
  let done_ids: HashSet<i64> = done.iter().map(|p| p.frontend_question_id).collect();
  catalog.iter().filter(|p| !done_ids.contains(&p.frontend_question_id)).cloned().collect()
}

pub fn resolve_candidates(done: &[Problem], source: CandidateSource, server_catalog: &[Problem]) -> Vec<Problem> {
  match source {
    CandidateSource::Catalog(all) => exclude_solved(done, &all),
    CandidateSource::NotDone(nd) => nd,
    CandidateSource::ServerCatalog => exclude_solved(done, server_catalog),
  }
}

#[instrument(level = "info", skip(state, req), fields(done = req.done.len(), preferred_tag = ?req.preferred_tag))]
pub async fn recommend(state: &AppState, req: RecommendIn) -> Result<Vec<Problem>, ApiError> {
  let source = candidate_source(req.all, req.not_done)?;
  let origin = source.label();
  let candidates = resolve_candidates(&req.done, source, &state.catalog);
  let top_k = state.recommender.settings().effective_top_k(req.top_k);

  let suggestions = state
    .recommender
    .suggest(&req.done, &candidates, req.preferred_tag.as_deref(), top_k)
    .await?;

  info!(target: "recommender", origin, candidates = candidates.len(), top_k, returned = suggestions.len(), "Recommendation served");
  Ok(suggestions)
}
