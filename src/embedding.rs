//! Text embedding capability and vector helpers.
//!
//! The recommender only sees the `Embedder` trait. Two backends exist:
//!   - `OpenAiEmbedder` (see `openai.rs`) when an API key is configured
//!   - `HashingEmbedder`, a deterministic offline fallback
//!
//! Both are built once at startup and shared read-only between requests.

use async_trait::async_trait;

use crate::error::EmbedError;

/// Turns texts into fixed-length vectors. One vector per input, same order.
#[async_trait]
pub trait Embedder: Send + Sync {
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

  /// Short backend name for logs.
  fn name(&self) -> &str;
}

/// Check the embedder contract: count matches input, every row has the same
/// length and every value is finite.
pub fn validate_embeddings(expected: usize, rows: &[Vec<f32>]) -> Result<(), EmbedError> {
  if rows.len() != expected {
    return Err(EmbedError::CountMismatch { expected, got: rows.len() });
  }
  if let Some(first) = rows.first() {
    if let Some(bad) = rows.iter().find(|r| r.len() != first.len()) {
      return Err(EmbedError::Ragged { first: first.len(), other: bad.len() });
    }
  }
  if let Some(row) = rows.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
    return Err(EmbedError::NonFinite { row });
  }
  Ok(())
}

/// Cosine similarity in [-1, 1]. Mismatched, empty or zero-norm inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() || a.is_empty() {
    return 0.0;
  }

  let mut dot = 0.0_f32;
  let mut norm_a = 0.0_f32;
  let mut norm_b = 0.0_f32;
  for (&x, &y) in a.iter().zip(b.iter()) {
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  let denom = norm_a.sqrt() * norm_b.sqrt();
  if denom < 1e-10 {
    0.0
  } else {
    (dot / denom).clamp(-1.0, 1.0)
  }
}

/// Element-wise mean of equally sized rows. Empty input yields an empty vector.
pub fn mean_vector(rows: &[Vec<f32>]) -> Vec<f32> {
  let Some(first) = rows.first() else { return Vec::new() };
  let mut acc = vec![0.0_f32; first.len()];
  for row in rows {
    for (slot, v) in acc.iter_mut().zip(row.iter()) {
      *slot += *v;
    }
  }
  let n = rows.len() as f32;
  acc.iter_mut().for_each(|v| *v /= n);
  acc
}

/// Offline feature-hashing embedder.
///
/// Lower-cased alphanumeric tokens and adjacent-token bigrams are hashed into
/// `dimensions` buckets with a sign bit, then the vector is L2-normalised.
/// Identical text always yields the identical vector.
#[derive(Clone, Debug)]
pub struct HashingEmbedder {
  dimensions: usize,
}

pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;

impl HashingEmbedder {
  pub fn new(dimensions: usize) -> Self {
    Self { dimensions: dimensions.max(1) }
  }

  fn embed_one(&self, text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; self.dimensions];
    let tokens = tokenize(text);

    let mut add = |feature: &str, weight: f32| {
      let h = fnv1a(feature.as_bytes());
      let idx = (h % self.dimensions as u64) as usize;
      let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
      v[idx] += sign * weight;
    };

    for t in &tokens {
      add(t, 1.0);
    }
    for pair in tokens.windows(2) {
      add(&format!("{} {}", pair[0], pair[1]), 0.5);
    }

    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
      v.iter_mut().for_each(|x| *x /= norm);
    }
    v
  }
}

impl Default for HashingEmbedder {
  fn default() -> Self {
    Self::new(DEFAULT_HASHING_DIMENSIONS)
  }
}

#[async_trait]
impl Embedder for HashingEmbedder {
  async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
    Ok(texts.iter().map(|t| self.embed_one(t)).collect())
  }

  fn name(&self) -> &str {
    "hashing"
  }
}

fn tokenize(s: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut cur = String::new();
  for ch in s.chars() {
    if ch.is_alphanumeric() {
      cur.extend(ch.to_lowercase());
    } else if !cur.is_empty() {
      out.push(std::mem::take(&mut cur));
    }
  }
  if !cur.is_empty() {
    out.push(cur);
  }
  out
}

fn fnv1a(bytes: &[u8]) -> u64 {
  let mut h: u64 = 0xcbf2_9ce4_8422_2325;
  for b in bytes {
    h ^= u64::from(*b);
    h = h.wrapping_mul(0x0000_0100_0000_01b3);
  }
  h
}
