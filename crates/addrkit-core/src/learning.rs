//! Learned corrections and the rules that reinforce them.
//!
//! A [`LearningRecord`] is keyed by `(original_detail, building_type)`. It is
//! created on the first sighting of a correction and updated in place on
//! every later sighting; the pipeline never deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  building::BuildingType,
  correction::{CorrectionType, GeneralizedPattern, generalize},
};

/// Confidence of a record on first sighting.
pub const INITIAL_CONFIDENCE: f64 = 0.80;
/// Added when the same correction is seen again.
pub const REPEAT_BOOST: f64 = 0.05;
/// Added when an applied correction is confirmed downstream.
pub const SUCCESS_BOOST: f64 = 0.02;

/// Minimum stored confidence for an exact-match hit.
pub const EXACT_MIN_CONFIDENCE: f64 = 0.7;
/// Minimum stored confidence for a regex-match candidate.
pub const REGEX_MIN_CONFIDENCE: f64 = 0.8;
pub const REGEX_CANDIDATE_LIMIT: usize = 100;
/// Minimum stored confidence for a fuzzy-match candidate.
pub const FUZZY_MIN_CONFIDENCE: f64 = 0.7;
pub const FUZZY_MIN_OCCURRENCES: u32 = 2;
pub const FUZZY_CANDIDATE_LIMIT: usize = 50;
/// Minimum bigram similarity for a fuzzy hit.
pub const FUZZY_MIN_SIMILARITY: f64 = 0.85;

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted, reinforced correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
  pub record_id:            Uuid,
  pub original_detail:      String,
  pub corrected_detail:     String,
  pub building_type:        BuildingType,
  pub correction_type:      CorrectionType,
  pub confidence:           f64,
  pub occurrence_count:     u32,
  pub success_count:        u32,
  /// Generalized matcher; only present on AI-analyzed or manual records.
  pub pattern_regex:        Option<String>,
  /// Substitution template for `pattern_regex` (`${n}` placeholders).
  pub corrected_template:   Option<String>,
  pub error_pattern:        Option<String>,
  pub problem_description:  Option<String>,
  pub solution_description: Option<String>,
  pub similar_patterns:     Vec<String>,
  pub extracted_memo:       Option<String>,
  pub user_confirmed:       bool,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
  pub last_used_at:         DateTime<Utc>,
  pub analyzed_at:          Option<DateTime<Utc>>,
}

/// Input to [`crate::store::PatternRepository::upsert_correction`].
#[derive(Debug, Clone, Default)]
pub struct NewCorrection {
  pub original_detail:      String,
  pub corrected_detail:     String,
  pub building_type:        Option<BuildingType>,
  pub correction_type:      Option<CorrectionType>,
  pub pattern:              Option<GeneralizedPattern>,
  pub problem_description:  Option<String>,
  pub solution_description: Option<String>,
  pub similar_patterns:     Vec<String>,
  pub extracted_memo:       Option<String>,
  pub user_confirmed:       bool,
}

impl NewCorrection {
  /// A rule-origin correction: correction type only, no generalized pattern.
  pub fn rule(original: &str, corrected: &str, building_type: BuildingType) -> Self {
    Self {
      original_detail: original.trim().to_owned(),
      corrected_detail: corrected.trim().to_owned(),
      building_type: Some(building_type),
      ..Self::default()
    }
  }

  /// An analyzed correction: additionally generalized over digit runs.
  pub fn analyzed(original: &str, corrected: &str, building_type: BuildingType) -> Self {
    Self {
      pattern: generalize(original, corrected),
      ..Self::rule(original, corrected, building_type)
    }
  }

  pub fn building_type(&self) -> BuildingType {
    self.building_type.unwrap_or(BuildingType::General)
  }

  /// The explicit correction type, or one inferred from the diff.
  pub fn correction_type(&self) -> CorrectionType {
    self.correction_type.unwrap_or_else(|| {
      crate::correction::infer_correction_type(&self.original_detail, &self.corrected_detail)
    })
  }
}

/// What a repeat sighting did to an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reinforcement {
  Inserted,
  Confirmed,
  Contradicted,
}

fn clamp_confidence(c: f64) -> f64 { c.clamp(0.0, 1.0) }

impl LearningRecord {
  /// Build the record for a first sighting.
  pub fn first_sighting(input: NewCorrection, now: DateTime<Utc>) -> Self {
    let building_type = input.building_type();
    let correction_type = input.correction_type();
    let analyzed_at = input.pattern.as_ref().map(|_| now);
    let (pattern_regex, corrected_template, error_pattern) = split_pattern(input.pattern);

    Self {
      record_id: Uuid::new_v4(),
      original_detail: input.original_detail,
      corrected_detail: input.corrected_detail,
      building_type,
      correction_type,
      confidence: INITIAL_CONFIDENCE,
      occurrence_count: 1,
      success_count: 0,
      pattern_regex,
      corrected_template,
      error_pattern,
      problem_description: input.problem_description,
      solution_description: input.solution_description,
      similar_patterns: input.similar_patterns,
      extracted_memo: input.extracted_memo,
      user_confirmed: input.user_confirmed,
      created_at: now,
      updated_at: now,
      last_used_at: now,
      analyzed_at,
    }
  }

  /// Fold a repeat sighting of this record's key into it.
  ///
  /// The same correction raises confidence by [`REPEAT_BOOST`]. A different
  /// correction replaces the stored one and caps confidence at
  /// [`INITIAL_CONFIDENCE`], since the replacement has been seen only once.
  /// Both bump `occurrence_count`.
  pub fn reinforce(&mut self, input: NewCorrection, now: DateTime<Utc>) -> Reinforcement {
    self.occurrence_count = self.occurrence_count.saturating_add(1);
    self.updated_at = now;
    self.user_confirmed |= input.user_confirmed;
    if input.extracted_memo.is_some() {
      self.extracted_memo = input.extracted_memo.clone();
    }

    if input.corrected_detail == self.corrected_detail {
      self.confidence = clamp_confidence(self.confidence + REPEAT_BOOST);
      if self.pattern_regex.is_none() && input.pattern.is_some() {
        self.apply_analysis(input, now);
      }
      return Reinforcement::Confirmed;
    }

    self.correction_type = input.correction_type();
    self.corrected_detail = input.corrected_detail.clone();
    self.confidence = self.confidence.min(INITIAL_CONFIDENCE);
    // The old generalization described the replaced correction.
    self.pattern_regex = None;
    self.corrected_template = None;
    self.error_pattern = None;
    self.analyzed_at = None;
    self.apply_analysis(input, now);
    Reinforcement::Contradicted
  }

  fn apply_analysis(&mut self, input: NewCorrection, now: DateTime<Utc>) {
    if input.pattern.is_some() {
      self.analyzed_at = Some(now);
    }
    let (regex, template, error_pattern) = split_pattern(input.pattern);
    self.pattern_regex = regex.or(self.pattern_regex.take());
    self.corrected_template = template.or(self.corrected_template.take());
    self.error_pattern = error_pattern.or(self.error_pattern.take());
    self.problem_description = input.problem_description.or(self.problem_description.take());
    self.solution_description = input.solution_description.or(self.solution_description.take());
    if !input.similar_patterns.is_empty() {
      self.similar_patterns = input.similar_patterns;
    }
  }

  /// A previously applied correction was confirmed downstream.
  pub fn record_success(&mut self, now: DateTime<Utc>) {
    self.confidence = clamp_confidence(self.confidence + SUCCESS_BOOST);
    self.success_count = self.success_count.saturating_add(1);
    self.updated_at = now;
  }

  /// The substitution template for regex hits.
  pub fn template(&self) -> &str {
    self.corrected_template.as_deref().unwrap_or(&self.corrected_detail)
  }
}

fn split_pattern(
  pattern: Option<GeneralizedPattern>,
) -> (Option<String>, Option<String>, Option<String>) {
  match pattern {
    Some(p) => (Some(p.regex), Some(p.template), Some(p.error_pattern)),
    None => (None, None, None),
  }
}

// ─── Similarity ──────────────────────────────────────────────────────────────

/// Bigram (Sørensen–Dice) similarity in `[0, 1]`, whitespace ignored.
pub fn similarity(a: &str, b: &str) -> f64 { strsim::sorensen_dice(a, b) }

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> DateTime<Utc> { Utc::now() }

  #[test]
  fn first_sighting_defaults() {
    let r = LearningRecord::first_sighting(
      NewCorrection::rule("101-1001", "101동 1001호", BuildingType::Apartment),
      now(),
    );
    assert_eq!(r.confidence, INITIAL_CONFIDENCE);
    assert_eq!(r.occurrence_count, 1);
    assert_eq!(r.success_count, 0);
    assert_eq!(r.correction_type, CorrectionType::HyphenToUnit);
    assert!(r.pattern_regex.is_none());
    assert!(r.analyzed_at.is_none());
  }

  #[test]
  fn analyzed_correction_carries_pattern() {
    let r = LearningRecord::first_sighting(
      NewCorrection::analyzed("101-1001", "101동 1001호", BuildingType::Apartment),
      now(),
    );
    assert!(r.pattern_regex.is_some());
    assert_eq!(r.template(), "${1}동 ${2}호");
    assert_eq!(r.error_pattern.as_deref(), Some("N-N"));
    assert!(r.analyzed_at.is_some());
  }

  #[test]
  fn identical_repeats_are_monotonic_and_capped() {
    let input = || NewCorrection::rule("101-1001", "101동 1001호", BuildingType::Apartment);
    let mut r = LearningRecord::first_sighting(input(), now());
    let mut previous = r.confidence;
    for _ in 0..20 {
      assert_eq!(r.reinforce(input(), now()), Reinforcement::Confirmed);
      assert!(r.confidence >= previous);
      assert!(r.confidence <= 1.0);
      previous = r.confidence;
    }
    assert_eq!(r.confidence, 1.0);
    assert_eq!(r.occurrence_count, 21);
  }

  #[test]
  fn contradiction_overwrites_and_caps_confidence() {
    let mut r = LearningRecord::first_sighting(
      NewCorrection::analyzed("101-1001", "101동 1001호", BuildingType::Apartment),
      now(),
    );
    for _ in 0..4 {
      r.reinforce(NewCorrection::rule("101-1001", "101동 1001호", BuildingType::Apartment), now());
    }
    assert!(r.confidence > INITIAL_CONFIDENCE);

    let outcome =
      r.reinforce(NewCorrection::rule("101-1001", "1001동 101호", BuildingType::Apartment), now());
    assert_eq!(outcome, Reinforcement::Contradicted);
    assert_eq!(r.corrected_detail, "1001동 101호");
    assert_eq!(r.confidence, INITIAL_CONFIDENCE);
    assert_eq!(r.occurrence_count, 6);
    assert!(r.pattern_regex.is_none());
  }

  #[test]
  fn success_boost_is_capped() {
    let mut r = LearningRecord::first_sighting(
      NewCorrection::rule("B1", "지하 1층", BuildingType::General),
      now(),
    );
    r.record_success(now());
    assert!((r.confidence - 0.82).abs() < 1e-9);
    assert_eq!(r.success_count, 1);
    for _ in 0..20 {
      r.record_success(now());
    }
    assert_eq!(r.confidence, 1.0);
  }

  #[test]
  fn similarity_bounds() {
    assert_eq!(similarity("101동 1001호", "101동 1001호"), 1.0);
    assert!(similarity("101동 1001호", "101동 1002호") > 0.7);
    assert!(similarity("101동 1001호", "지하 1층") < 0.5);
  }
}
