//! Minimal OpenAI client for the embeddings endpoint.
//!
//! One batched `POST /embeddings` per call. Calls are instrumented and log the
//! model, batch size and latency (never the texts). No retries: a failed call
//! is returned to the caller as an `EmbedError`.
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::embedding::{validate_embeddings, Embedder};
use crate::error::EmbedError;

#[derive(Clone)]
pub struct OpenAiEmbedder {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAiEmbedder {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_EMBED_MODEL").unwrap_or_else(|_| "text-embedding-3-small".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
  #[instrument(level = "info", skip(self, texts), fields(model = %self.model, batch = texts.len()))]
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }

    let url = format!("{}/embeddings", self.base_url);
    let req = EmbeddingRequest { model: &self.model, input: texts };
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "problem-recommender/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "OpenAI embeddings call failed");
      return Err(EmbedError::Http { status: status.as_u16(), message });
    }

    let body: EmbeddingResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    info!(elapsed = ?start.elapsed(), "Embeddings received");

    let rows = into_ordered_rows(body.data);
    validate_embeddings(texts.len(), &rows)?;
    Ok(rows)
  }

  fn name(&self) -> &str {
    "openai"
  }
}

// --- Embedding DTOs ---

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingDatum>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct EmbeddingDatum {
  #[serde(default)] index: usize,
  embedding: Vec<f32>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// The API may return items out of order; `index` refers to the input position.
fn into_ordered_rows(mut data: Vec<EmbeddingDatum>) -> Vec<Vec<f32>> {
  data.sort_by_key(|d| d.index);
  data.into_iter().map(|d| d.embedding).collect()
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
