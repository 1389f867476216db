//! Loading service configuration (ranking knobs, embedding fallback, catalog path) from TOML.
//!
//! Every field is optional in the file; missing sections fall back to `Default`.
//! Env variables take precedence for the catalog path (CATALOG_PATH).

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Problem;
use crate::embedding::DEFAULT_HASHING_DIMENSIONS;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServiceConfig {
  #[serde(default)]
  pub ranking: RankingSettings,
  #[serde(default)]
  pub embedding: EmbeddingSettings,
  #[serde(default)]
  pub catalog_path: Option<String>,
}

/// Knobs of the ranking algorithm.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
  /// Default number of suggestions when the request does not ask for one.
  pub top_k: usize,
  /// Upper bound for a per-request `topK`.
  pub max_top_k: usize,
  /// Weight of the hardness bonus in the final score.
  pub hardness_weight: f64,
  /// Match user tags against candidate tags with exact case (legacy behavior).
  pub case_sensitive_overlap: bool,
}

impl Default for RankingSettings {
  fn default() -> Self {
    Self {
      top_k: 50,
      max_top_k: 200,
      hardness_weight: 0.2,
      case_sensitive_overlap: false,
    }
  }
}

impl RankingSettings {
  /// Resolve a requested top-k against the configured default and upper bound.
  /// Zero is honored and yields an empty list.
  pub fn effective_top_k(&self, requested: Option<usize>) -> usize {
    requested.unwrap_or(self.top_k).min(self.max_top_k)
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
  /// Vector size of the offline hashing embedder.
  pub dimensions: usize,
}

impl Default for EmbeddingSettings {
  fn default() -> Self {
    Self { dimensions: DEFAULT_HASHING_DIMENSIONS }
  }
}

/// Attempt to load `ServiceConfig` from RECOMMENDER_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_service_config_from_env() -> Option<ServiceConfig> {
  let path = std::env::var("RECOMMENDER_CONFIG_PATH").ok()?;
  match load_service_config(&path) {
    Ok(cfg) => {
      info!(target: "problem_recommender", %path, "Loaded service config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "problem_recommender", %path, error = %e, "Failed to load service config");
      None
    }
  }
}

pub fn load_service_config(path: &str) -> Result<ServiceConfig, ConfigError> {
  let s = std::fs::read_to_string(path)
    .map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  toml::from_str::<ServiceConfig>(&s)
    .map_err(|source| ConfigError::Toml { path: path.to_string(), source })
}

/// Read a catalog file: a JSON array of problems.
pub fn load_catalog(path: &str) -> Result<Vec<Problem>, ConfigError> {
  let s = std::fs::read_to_string(path)
    .map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  serde_json::from_str::<Vec<Problem>>(&s)
    .map_err(|source| ConfigError::Catalog { path: path.to_string(), source })
}
