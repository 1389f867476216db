//! Domain models used by the backend: problems from the judge catalog and their difficulty.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Judge-assigned difficulty bucket.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A single catalog problem. Field names follow the upstream catalog JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub frontend_question_id: i64,
  pub title_slug: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  pub difficulty: Difficulty,
  pub ac_rate: f64, // percentage, 0-100
  #[serde(default)]
  pub topic_tags: Vec<String>,
}

impl Problem {
  /// Case-insensitive tag membership.
  pub fn has_tag_ci(&self, tag: &str) -> bool {
    let needle = tag.to_lowercase();
    self.topic_tags.iter().any(|t| t.to_lowercase() == needle)
  }

  /// Human-readable title derived from the slug ("two-sum" -> "two sum").
  pub fn display_title(&self) -> String {
    self.title_slug.replace('-', " ")
  }

  /// Canonical text fed to the embedding model.
  pub fn render_for_embedding(&self) -> String {
    format!(
      "{} | Difficulty: {} | Acceptance: {:.2}% | Topics: {}",
      self.display_title(),
      self.difficulty,
      self.ac_rate,
      self.topic_tags.join(", ")
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn two_sum() -> Problem {
    Problem {
      frontend_question_id: 1,
      title_slug: "two-sum".into(),
      title: None,
      difficulty: Difficulty::Easy,
      ac_rate: 53.456,
      topic_tags: vec!["Array".into(), "Hash Table".into()],
    }
  }

  #[test]
  fn render_uses_spaces_and_two_decimals() {
    assert_eq!(
      two_sum().render_for_embedding(),
      "two sum | Difficulty: Easy | Acceptance: 53.46% | Topics: Array, Hash Table"
    );
  }

  #[test]
  fn tag_match_ignores_case() {
    let p = two_sum();
    assert!(p.has_tag_ci("array"));
    assert!(p.has_tag_ci("HASH TABLE"));
    assert!(!p.has_tag_ci("graph"));
  }

  #[test]
  fn deserializes_catalog_shape() {
    let raw = r#"{"titleSlug":"lru-cache","difficulty":"Medium","acRate":44.1,
                  "frontendQuestionId":146,"topicTags":["Design","Linked List"]}"#;
    let p: Problem = serde_json::from_str(raw).expect("parse");
    assert_eq!(p.frontend_question_id, 146);
    assert_eq!(p.difficulty, Difficulty::Medium);
    assert_eq!(p.topic_tags.len(), 2);

    let out = serde_json::to_value(&p).expect("serialize");
    assert_eq!(out["titleSlug"], "lru-cache");
    assert!(out.get("title").is_none());
  }

  #[test]
  fn missing_tags_default_to_empty() {
    let raw = r#"{"titleSlug":"x","difficulty":"Hard","acRate":10,"frontendQuestionId":9}"#;
    let p: Problem = serde_json::from_str(raw).expect("parse");
    assert!(p.topic_tags.is_empty());
  }
}
