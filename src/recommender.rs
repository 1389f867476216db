//! Next-problem ranking.
//!
//! Given the problems a user has solved and the pool of problems they have not,
//! pick what to practise next:
//!   - cold start (nothing solved): most-accepted first, Easy before others on ties
//!   - preferred tag the user never solved: most-accepted first, slug on ties
//!   - otherwise: cosine similarity to the user's mean embedding plus a bonus
//!     for problems harder (lower acceptance) than the user's average
//!
//! Empty pools at any step produce an empty list, never an error. Only embedding
//! faults are returned as errors.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::RankingSettings;
use crate::domain::{Difficulty, Problem};
use crate::embedding::{cosine_similarity, mean_vector, validate_embeddings, Embedder};
use crate::error::EmbedError;

/// Score boost for candidates harder than the user's average acceptance rate.
/// Non-negative; zero when the candidate is at least as easy as the average.
pub fn hardness_bonus(avg_ac: f64, candidate_ac: f64) -> f64 {
  ((avg_ac - candidate_ac) / 100.0).max(0.0)
}

/// Final ranking score.
pub fn combined_score(similarity: f64, hardness: f64, hardness_weight: f64) -> f64 {
  similarity + hardness_weight * hardness
}

/// Acceptance descending, then Easy before Medium/Hard. Stable sort keeps input order on ties.
fn sort_cold_start(pool: &mut [Problem]) {
  pool.sort_by(|a, b| {
    b.ac_rate
      .total_cmp(&a.ac_rate)
      .then_with(|| (a.difficulty != Difficulty::Easy).cmp(&(b.difficulty != Difficulty::Easy)))
  });
}

/// Acceptance descending, then slug ascending.
fn sort_tag_fallback(pool: &mut [Problem]) {
  pool.sort_by(|a, b| {
    b.ac_rate
      .total_cmp(&a.ac_rate)
      .then_with(|| a.title_slug.cmp(&b.title_slug))
  });
}

fn with_tag(problems: &[Problem], tag: &str) -> Vec<Problem> {
  problems.iter().filter(|p| p.has_tag_ci(tag)).cloned().collect()
}

pub struct Recommender {
  embedder: Arc<dyn Embedder>,
  settings: RankingSettings,
}

impl Recommender {
  pub fn new(embedder: Arc<dyn Embedder>, settings: RankingSettings) -> Self {
    Self { embedder, settings }
  }

  pub fn settings(&self) -> &RankingSettings {
    &self.settings
  }

  pub fn embedder_name(&self) -> &str {
    self.embedder.name()
  }

  /// Rank `not_done` for a user who solved `done`. The pool is used as given;
  /// excluding solved problems is the caller's job.
  #[instrument(
    level = "info",
    skip(self, done, not_done),
    fields(done = done.len(), not_done = not_done.len())
  )]
  pub async fn suggest(
    &self,
    done: &[Problem],
    not_done: &[Problem],
    preferred_tag: Option<&str>,
    top_k: usize,
  ) -> Result<Vec<Problem>, EmbedError> {
    let preferred_tag = preferred_tag.map(str::trim).filter(|t| !t.is_empty());

    if done.is_empty() {
      let mut pool = match preferred_tag {
        Some(tag) => with_tag(not_done, tag),
        None => not_done.to_vec(),
      };
      sort_cold_start(&mut pool);
      pool.truncate(top_k);
      debug!(target: "recommender", branch = "cold_start", returned = pool.len(), "Ranked");
      return Ok(pool);
    }

    let (done, candidates) = match preferred_tag {
      Some(tag) => {
        let tagged_done = with_tag(done, tag);
        let mut tagged_not_done = with_tag(not_done, tag);
        if tagged_done.is_empty() {
          sort_tag_fallback(&mut tagged_not_done);
          tagged_not_done.truncate(top_k);
          debug!(target: "recommender", branch = "tag_fallback", %tag, returned = tagged_not_done.len(), "Ranked");
          return Ok(tagged_not_done);
        }
        if tagged_not_done.is_empty() {
          debug!(target: "recommender", branch = "empty", %tag, "No unsolved problem carries the preferred tag");
          return Ok(Vec::new());
        }
        (tagged_done, tagged_not_done)
      }
      None => (done.to_vec(), not_done.to_vec()),
    };

    self.rank_by_similarity(&done, candidates, top_k).await
  }

  async fn rank_by_similarity(
    &self,
    done: &[Problem],
    candidates: Vec<Problem>,
    top_k: usize,
  ) -> Result<Vec<Problem>, EmbedError> {
    let case_sensitive = self.settings.case_sensitive_overlap;
    let norm = |t: &String| if case_sensitive { t.clone() } else { t.to_lowercase() };

    let user_tags: HashSet<String> = done.iter().flat_map(|p| p.topic_tags.iter().map(norm)).collect();
    let filtered: Vec<Problem> = candidates
      .into_iter()
      .filter(|p| p.topic_tags.iter().any(|t| user_tags.contains(&norm(t))))
      .collect();
    if filtered.is_empty() {
      debug!(target: "recommender", branch = "empty", user_tags = user_tags.len(), "No candidate shares a tag with the solved set");
      return Ok(Vec::new());
    }

    let avg_ac = done.iter().map(|p| p.ac_rate).sum::<f64>() / done.len() as f64;

    let texts: Vec<String> = done
      .iter()
      .chain(filtered.iter())
      .map(Problem::render_for_embedding)
      .collect();
    let vectors = self.embedder.embed(&texts).await?;
    validate_embeddings(texts.len(), &vectors)?;
    let (done_vecs, cand_vecs) = vectors.split_at(done.len());

    let user_vector = mean_vector(done_vecs);

    let mut scored: Vec<(f64, Problem)> = filtered
      .into_iter()
      .zip(cand_vecs.iter())
      .map(|(p, v)| {
        let sim = f64::from(cosine_similarity(&user_vector, v));
        let hardness = hardness_bonus(avg_ac, p.ac_rate);
        (combined_score(sim, hardness, self.settings.hardness_weight), p)
      })
      .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(top_k);

    debug!(
      target: "recommender",
      branch = "scored",
      embedder = self.embedder.name(),
      avg_ac = %format!("{:.2}", avg_ac),
      top_score = ?scored.first().map(|(s, _)| *s),
      returned = scored.len(),
      "Ranked"
    );
    Ok(scored.into_iter().map(|(_, p)| p).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

  use async_trait::async_trait;

  use crate::embedding::HashingEmbedder;

  /// Looks up vectors by display title (text before the first " | ").
  struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
  }

  impl TableEmbedder {
    fn new(entries: &[(&str, Vec<f32>)]) -> Self {
      Self {
        table: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        calls: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl Embedder for TableEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
      self.calls.fetch_add(1, AtomicOrdering::SeqCst);
      Ok(texts
        .iter()
        .map(|t| {
          let title = t.split(" | ").next().unwrap_or_default();
          self.table.get(title).cloned().unwrap_or_else(|| vec![1.0, 0.0])
        })
        .collect())
    }

    fn name(&self) -> &str {
      "table"
    }
  }

  struct FailingEmbedder;

  #[async_trait]
  impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
      Err(EmbedError::Http { status: 503, message: "model unavailable".into() })
    }

    fn name(&self) -> &str {
      "failing"
    }
  }

  struct NanEmbedder;

  #[async_trait]
  impl Embedder for NanEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
      Ok(texts.iter().map(|_| vec![f32::NAN, 1.0]).collect())
    }

    fn name(&self) -> &str {
      "nan"
    }
  }

  struct ShortEmbedder;

  #[async_trait]
  impl Embedder for ShortEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
      Ok(vec![vec![1.0]])
    }

    fn name(&self) -> &str {
      "short"
    }
  }

  fn p(id: i64, slug: &str, difficulty: Difficulty, ac: f64, tags: &[&str]) -> Problem {
    Problem {
      frontend_question_id: id,
      title_slug: slug.into(),
      title: None,
      difficulty,
      ac_rate: ac,
      topic_tags: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  fn ids(ps: &[Problem]) -> Vec<i64> {
    ps.iter().map(|p| p.frontend_question_id).collect()
  }

  fn recommender(embedder: Arc<dyn Embedder>) -> Recommender {
    Recommender::new(embedder, RankingSettings::default())
  }

  #[tokio::test]
  async fn cold_start_orders_by_acceptance() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let all = vec![
      p(1, "a", Difficulty::Easy, 50.0, &[]),
      p(2, "b", Difficulty::Hard, 70.0, &[]),
    ];
    let out = r.suggest(&[], &all, None, 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![2, 1]);
  }

  #[tokio::test]
  async fn cold_start_puts_easy_first_on_equal_acceptance_regardless_of_input_order() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let mut all = vec![
      p(1, "a", Difficulty::Medium, 60.0, &[]),
      p(2, "b", Difficulty::Easy, 60.0, &[]),
      p(3, "c", Difficulty::Hard, 90.0, &[]),
      p(4, "d", Difficulty::Easy, 10.0, &[]),
    ];
    let first = r.suggest(&[], &all, None, 50).await.expect("suggest");
    all.reverse();
    let second = r.suggest(&[], &all, None, 50).await.expect("suggest");
    assert_eq!(ids(&first), vec![3, 2, 1, 4]);
    assert_eq!(ids(&first), ids(&second));
  }

  #[tokio::test]
  async fn cold_start_does_not_call_the_embedder() {
    let table = Arc::new(TableEmbedder::new(&[]));
    let r = recommender(table.clone());
    let all = vec![p(1, "a", Difficulty::Easy, 50.0, &["Array"])];
    r.suggest(&[], &all, Some("array"), 50).await.expect("suggest");
    assert_eq!(table.calls.load(AtomicOrdering::SeqCst), 0);
  }

  #[tokio::test]
  async fn cold_start_with_tag_filters_case_insensitively_and_truncates() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let all = vec![
      p(1, "a", Difficulty::Easy, 40.0, &["Array"]),
      p(2, "b", Difficulty::Easy, 80.0, &["Graph"]),
      p(3, "c", Difficulty::Medium, 60.0, &["array", "Sorting"]),
      p(4, "d", Difficulty::Hard, 20.0, &["ARRAY"]),
    ];
    let out = r.suggest(&[], &all, Some("array"), 2).await.expect("suggest");
    assert_eq!(ids(&out), vec![3, 1]);
  }

  #[tokio::test]
  async fn preferred_tag_without_candidates_is_empty() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let done = vec![p(1, "a", Difficulty::Easy, 80.0, &["Array"])];
    let all = vec![p(2, "b", Difficulty::Easy, 80.0, &["Graph"])];
    assert!(r.suggest(&[], &all, Some("Array"), 50).await.expect("suggest").is_empty());
    assert!(r.suggest(&done, &all, Some("Array"), 50).await.expect("suggest").is_empty());
  }

  #[tokio::test]
  async fn unsolved_preferred_tag_falls_back_to_acceptance_then_slug() {
    let table = Arc::new(TableEmbedder::new(&[]));
    let r = recommender(table.clone());
    let done = vec![p(1, "solved", Difficulty::Easy, 80.0, &["Array"])];
    let not_done = vec![
      p(2, "zeta", Difficulty::Easy, 50.0, &["Graph"]),
      p(3, "alpha", Difficulty::Hard, 50.0, &["graph"]),
      p(4, "mid", Difficulty::Medium, 75.0, &["Graph"]),
      p(5, "other", Difficulty::Easy, 99.0, &["Array"]),
    ];
    let out = r.suggest(&done, &not_done, Some("GRAPH"), 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![4, 3, 2]);
    assert_eq!(table.calls.load(AtomicOrdering::SeqCst), 0);
  }

  #[tokio::test]
  async fn tag_fallback_is_cut_to_top_k() {
    let r = recommender(Arc::new(TableEmbedder::new(&[])));
    let done = vec![p(1, "solved", Difficulty::Easy, 80.0, &["Array"])];
    let not_done = vec![
      p(2, "zeta", Difficulty::Easy, 50.0, &["Graph"]),
      p(3, "alpha", Difficulty::Hard, 50.0, &["Graph"]),
      p(4, "mid", Difficulty::Medium, 75.0, &["Graph"]),
      p(5, "low", Difficulty::Hard, 10.0, &["Graph"]),
    ];
    let out = r.suggest(&done, &not_done, Some("graph"), 2).await.expect("suggest");
    assert_eq!(ids(&out), vec![4, 3]);
  }

  #[tokio::test]
  async fn candidates_without_shared_tags_are_dropped() {
    let r = recommender(Arc::new(TableEmbedder::new(&[])));
    let done = vec![p(1, "one", Difficulty::Easy, 80.0, &["array"])];
    let not_done = vec![
      p(2, "two", Difficulty::Medium, 40.0, &["array"]),
      p(3, "three", Difficulty::Easy, 90.0, &["graph"]),
    ];
    let out = r.suggest(&done, &not_done, None, 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![2]);
  }

  #[tokio::test]
  async fn no_overlap_at_all_is_empty_without_embedding() {
    let table = Arc::new(TableEmbedder::new(&[]));
    let r = recommender(table.clone());
    let done = vec![p(1, "one", Difficulty::Easy, 80.0, &["array"])];
    let not_done = vec![p(2, "two", Difficulty::Easy, 90.0, &["graph"]), p(3, "three", Difficulty::Easy, 90.0, &[])];
    assert!(r.suggest(&done, &not_done, None, 50).await.expect("suggest").is_empty());
    assert_eq!(table.calls.load(AtomicOrdering::SeqCst), 0);
  }

  #[tokio::test]
  async fn closer_embedding_ranks_higher() {
    let r = recommender(Arc::new(TableEmbedder::new(&[
      ("solved", vec![1.0, 0.0]),
      ("near", vec![0.9, 0.1]),
      ("far", vec![0.1, 0.9]),
    ])));
    let done = vec![p(1, "solved", Difficulty::Easy, 50.0, &["Tree"])];
    let not_done = vec![
      p(2, "far", Difficulty::Easy, 50.0, &["Tree"]),
      p(3, "near", Difficulty::Easy, 50.0, &["Tree"]),
    ];
    let out = r.suggest(&done, &not_done, None, 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![3, 2]);
  }

  #[tokio::test]
  async fn harder_problem_wins_when_similarity_ties() {
    let r = recommender(Arc::new(TableEmbedder::new(&[])));
    let done = vec![
      p(1, "s1", Difficulty::Easy, 70.0, &["DP"]),
      p(2, "s2", Difficulty::Easy, 50.0, &["DP"]),
    ];
    let not_done = vec![
      p(3, "easier", Difficulty::Easy, 80.0, &["DP"]),
      p(4, "harder", Difficulty::Hard, 20.0, &["DP"]),
      p(5, "bit-harder", Difficulty::Medium, 55.0, &["DP"]),
    ];
    let out = r.suggest(&done, &not_done, None, 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![4, 5, 3]);
  }

  #[tokio::test]
  async fn preferred_tag_restricts_solved_and_candidates_before_scoring() {
    let r = recommender(Arc::new(TableEmbedder::new(&[])));
    let done = vec![
      p(1, "s-graph", Difficulty::Easy, 90.0, &["Graph"]),
      p(2, "s-array", Difficulty::Easy, 10.0, &["Array"]),
    ];
    let not_done = vec![
      p(3, "c-array", Difficulty::Easy, 5.0, &["Array"]),
      p(4, "c-graph-easy", Difficulty::Easy, 95.0, &["Graph"]),
      p(5, "c-graph-mid", Difficulty::Medium, 70.0, &["graph"]),
    ];
    let out = r.suggest(&done, &not_done, Some("graph"), 50).await.expect("suggest");
    // Graph-only solves average 90, so 70 earns a bonus. Over all solves (50) it would not.
    assert_eq!(ids(&out), vec![5, 4]);

    let untagged = r.suggest(&done, &not_done[1..], None, 50).await.expect("suggest");
    assert_eq!(ids(&untagged), vec![4, 5]);
  }

  #[tokio::test]
  async fn overlap_case_handling_follows_settings() {
    let done = vec![p(1, "s", Difficulty::Easy, 50.0, &["Array"])];
    let not_done = vec![p(2, "c", Difficulty::Easy, 50.0, &["array"])];

    let relaxed = recommender(Arc::new(TableEmbedder::new(&[])));
    assert_eq!(ids(&relaxed.suggest(&done, &not_done, None, 50).await.expect("suggest")), vec![2]);

    let strict = Recommender::new(
      Arc::new(TableEmbedder::new(&[])),
      RankingSettings { case_sensitive_overlap: true, ..RankingSettings::default() },
    );
    assert!(strict.suggest(&done, &not_done, None, 50).await.expect("suggest").is_empty());
  }

  #[tokio::test]
  async fn result_never_exceeds_top_k() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let done = vec![p(1, "s", Difficulty::Easy, 50.0, &["Array"])];
    let not_done: Vec<Problem> =
      (2..40).map(|i| p(i, &format!("c-{i}"), Difficulty::Medium, i as f64, &["Array"])).collect();
    assert_eq!(r.suggest(&done, &not_done, None, 7).await.expect("suggest").len(), 7);
    assert_eq!(r.suggest(&done, &not_done, None, 500).await.expect("suggest").len(), not_done.len());
  }

  #[tokio::test]
  async fn scoring_is_repeatable_with_deterministic_embeddings() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let done = vec![
      p(1, "two-sum", Difficulty::Easy, 53.0, &["Array", "Hash Table"]),
      p(15, "3sum", Difficulty::Medium, 35.0, &["Array", "Two Pointers", "Sorting"]),
    ];
    let not_done = vec![
      p(18, "4sum", Difficulty::Medium, 37.0, &["Array", "Two Pointers", "Sorting"]),
      p(49, "group-anagrams", Difficulty::Medium, 69.0, &["Array", "Hash Table", "String"]),
      p(42, "trapping-rain-water", Difficulty::Hard, 63.0, &["Array", "Two Pointers", "Stack"]),
      p(200, "number-of-islands", Difficulty::Medium, 60.0, &["Graph", "Breadth-First Search"]),
    ];
    let a = r.suggest(&done, &not_done, None, 50).await.expect("suggest");
    let b = r.suggest(&done, &not_done, None, 50).await.expect("suggest");
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.len(), 3);
  }

  #[tokio::test]
  async fn embedding_faults_propagate() {
    let r = recommender(Arc::new(FailingEmbedder));
    let done = vec![p(1, "s", Difficulty::Easy, 50.0, &["Array"])];
    let not_done = vec![p(2, "c", Difficulty::Easy, 50.0, &["Array"])];
    let err = r.suggest(&done, &not_done, None, 50).await.unwrap_err();
    assert!(matches!(err, EmbedError::Http { status: 503, .. }));
  }

  #[tokio::test]
  async fn malformed_embedder_output_is_an_error() {
    let r = recommender(Arc::new(ShortEmbedder));
    let done = vec![p(1, "s", Difficulty::Easy, 50.0, &["Array"])];
    let not_done = vec![p(2, "c", Difficulty::Easy, 50.0, &["Array"])];
    let err = r.suggest(&done, &not_done, None, 50).await.unwrap_err();
    assert!(matches!(err, EmbedError::CountMismatch { expected: 2, got: 1 }));
  }

  #[tokio::test]
  async fn non_finite_embeddings_are_rejected() {
    let r = recommender(Arc::new(NanEmbedder));
    let done = vec![p(1, "s", Difficulty::Easy, 50.0, &["Array"])];
    let not_done = vec![p(2, "c", Difficulty::Easy, 50.0, &["Array"]), p(3, "d", Difficulty::Easy, 40.0, &["Array"])];
    let err = r.suggest(&done, &not_done, None, 50).await.unwrap_err();
    assert!(matches!(err, EmbedError::NonFinite { row: 0 }));
  }

  #[tokio::test]
  async fn blank_preferred_tag_is_ignored() {
    let r = recommender(Arc::new(HashingEmbedder::default()));
    let all = vec![p(1, "a", Difficulty::Easy, 50.0, &[]), p(2, "b", Difficulty::Easy, 70.0, &[])];
    let out = r.suggest(&[], &all, Some("   "), 50).await.expect("suggest");
    assert_eq!(ids(&out), vec![2, 1]);
  }

  #[test]
  fn hardness_bonus_is_non_negative() {
    assert_eq!(hardness_bonus(60.0, 70.0), 0.0);
    assert_eq!(hardness_bonus(60.0, 60.0), 0.0);
    assert!((hardness_bonus(60.0, 40.0) - 0.2).abs() < 1e-12);
  }

  #[test]
  fn score_is_monotonic_in_similarity() {
    let h = hardness_bonus(70.0, 35.0);
    let mut prev = f64::NEG_INFINITY;
    for i in -10..=10 {
      let s = combined_score(i as f64 / 10.0, h, 0.2);
      assert!(s >= prev);
      prev = s;
    }
  }
}
