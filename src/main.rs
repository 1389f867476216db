//! Problem Recommender · Next-practice-problem backend
//!
//! - Axum HTTP API (`POST /recommend`)
//! - Embedding-based ranking, via OpenAI embeddings or an offline hashing embedder
//! - Optional server-side problem catalog (JSON)
//!
//! Important env variables:
//!   PORT                    : u16 (default 8000)
//!   OPENAI_API_KEY          : enables OpenAI embeddings if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_EMBED_MODEL      : default "text-embedding-3-small"
//!   CATALOG_PATH            : JSON array of problems served and ranked by default
//!   RECOMMENDER_CONFIG_PATH : path to TOML config (ranking knobs, catalog path)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod domain;
mod error;
mod config;
mod embedding;
mod openai;
mod recommender;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Built once: embedding backend, ranking settings, catalog.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "problem_recommender", %addr, embedder = state.recommender.embedder_name(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "problem_recommender", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "problem_recommender", "Shutdown signal received");
}
