//! Error types shared across the backend.
//!
//! Empty recommendation lists are never errors; only faults of the embedding
//! capability, startup loading problems and rejected requests end up here.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

use crate::protocol::ErrorOut;

/// Faults raised by an embedding backend. Propagated unmasked to the caller.
#[derive(Error, Debug)]
pub enum EmbedError {
  #[error("embedding request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("embedding provider HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("embedding provider returned {got} vectors for {expected} texts")]
  CountMismatch { expected: usize, got: usize },

  #[error("embedding vectors have inconsistent dimensions ({first} vs {other})")]
  Ragged { first: usize, other: usize },

  #[error("embedding vector {row} contains non-finite values")]
  NonFinite { row: usize },
}

/// Startup configuration and catalog loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse TOML {path}: {source}")]
  Toml {
    path: String,
    #[source]
    source: toml::de::Error,
  },

  #[error("failed to parse catalog JSON {path}: {source}")]
  Catalog {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Errors surfaced by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  #[error(transparent)]
  Embedding(#[from] EmbedError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Embedding(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(ErrorOut { message: self.to_string() })).into_response()
  }
}
