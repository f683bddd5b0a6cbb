//! The learned-pattern tiers (exact, regex, fuzzy) and the write path.
//!
//! Lookups never fail: a repository error or a malformed learned regex is
//! logged and the tier counts as a miss.

use std::{
  collections::HashMap,
  sync::{Mutex, PoisonError},
};

use addrkit_core::{
  building::BuildingType,
  learning::{
    EXACT_MIN_CONFIDENCE,
    FUZZY_CANDIDATE_LIMIT,
    FUZZY_MIN_CONFIDENCE,
    FUZZY_MIN_OCCURRENCES,
    FUZZY_MIN_SIMILARITY,
    LearningRecord,
    NewCorrection,
    REGEX_CANDIDATE_LIMIT,
    REGEX_MIN_CONFIDENCE,
    Reinforcement,
    similarity,
  },
  resolution::ResolutionSource,
  store::{LearningStats, PatternRepository, RecordQuery},
};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A learned correction that answered a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternHit {
  pub record_id:  Uuid,
  pub corrected:  String,
  pub confidence: f64,
  pub tier:       ResolutionSource,
}

/// A correction entered by an operator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCorrection {
  pub original_detail:  String,
  pub corrected_detail: String,
  pub building_type:    BuildingType,
  #[serde(default)]
  pub extracted_memo:   Option<String>,
}

/// Learned-pattern lookups and writes over a [`PatternRepository`].
pub struct PatternStore<R> {
  repo:  R,
  /// Compiled learned regexes by source text; `None` marks one that failed.
  cache: Mutex<HashMap<String, Option<Regex>>>,
}

impl<R: PatternRepository> PatternStore<R> {
  pub fn new(repo: R) -> Self { Self { repo, cache: Mutex::new(HashMap::new()) } }

  pub fn repository(&self) -> &R { &self.repo }

  // ── Lookups ───────────────────────────────────────────────────────────────

  /// Try the exact, regex and fuzzy tiers in order.
  pub async fn lookup(&self, detail: &str, building_type: BuildingType) -> Option<PatternHit> {
    let detail = detail.trim();
    if detail.is_empty() {
      return None;
    }

    if let Some(hit) = self.exact(detail, building_type).await {
      return Some(hit);
    }
    if let Some(hit) = self.regex(detail, building_type).await {
      return Some(hit);
    }
    self.fuzzy(detail, building_type).await
  }

  async fn exact(&self, detail: &str, building_type: BuildingType) -> Option<PatternHit> {
    let record = match self.repo.find_exact(detail, building_type, EXACT_MIN_CONFIDENCE).await {
      Ok(r) => r?,
      Err(e) => {
        warn!(error = %e, "exact pattern lookup failed");
        return None;
      }
    };

    if let Err(e) = self.repo.touch_last_used(record.record_id).await {
      warn!(error = %e, record = %record.record_id, "could not bump last_used_at");
    }
    debug!(detail, corrected = %record.corrected_detail, "exact pattern hit");
    Some(PatternHit {
      record_id:  record.record_id,
      corrected:  record.corrected_detail,
      confidence: record.confidence,
      tier:       ResolutionSource::Exact,
    })
  }

  async fn regex(&self, detail: &str, building_type: BuildingType) -> Option<PatternHit> {
    let candidates = match self
      .repo
      .find_regex_candidates(building_type, REGEX_MIN_CONFIDENCE, REGEX_CANDIDATE_LIMIT)
      .await
    {
      Ok(c) => c,
      Err(e) => {
        warn!(error = %e, "regex candidate lookup failed");
        return None;
      }
    };

    candidates.into_iter().find_map(|record| {
      let pattern = record.pattern_regex.as_deref()?;
      let re = self.compiled(pattern)?;
      let caps = re.captures(detail)?;
      let mut corrected = String::new();
      caps.expand(record.template(), &mut corrected);
      debug!(detail, pattern, %corrected, "regex pattern hit");
      Some(PatternHit {
        record_id: record.record_id,
        corrected,
        confidence: record.confidence,
        tier: ResolutionSource::Regex,
      })
    })
  }

  async fn fuzzy(&self, detail: &str, building_type: BuildingType) -> Option<PatternHit> {
    let candidates = match self
      .repo
      .find_fuzzy_candidates(
        building_type,
        FUZZY_MIN_CONFIDENCE,
        FUZZY_MIN_OCCURRENCES,
        FUZZY_CANDIDATE_LIMIT,
      )
      .await
    {
      Ok(c) => c,
      Err(e) => {
        warn!(error = %e, "fuzzy candidate lookup failed");
        return None;
      }
    };

    candidates.into_iter().find_map(|record| {
      let score = similarity(detail, &record.original_detail);
      (score >= FUZZY_MIN_SIMILARITY).then(|| {
        debug!(detail, matched = %record.original_detail, score, "fuzzy pattern hit");
        PatternHit {
          record_id:  record.record_id,
          corrected:  record.corrected_detail,
          confidence: score * record.confidence,
          tier:       ResolutionSource::Fuzzy,
        }
      })
    })
  }

  fn compiled(&self, pattern: &str) -> Option<Regex> {
    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    cache
      .entry(pattern.to_owned())
      .or_insert_with(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
          warn!(pattern, error = %e, "skipping malformed learned pattern");
          None
        }
      })
      .clone()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  pub async fn save(&self, input: NewCorrection) -> Result<(LearningRecord, Reinforcement)> {
    let (record, outcome) = self
      .repo
      .upsert_correction(input)
      .await
      .map_err(Error::repository)?;
    debug!(
      original = %record.original_detail,
      corrected = %record.corrected_detail,
      ?outcome,
      confidence = record.confidence,
      "saved correction"
    );
    Ok((record, outcome))
  }

  /// Record an operator's correction. It is generalized like an AI-analyzed
  /// one and marked user-confirmed.
  pub async fn save_manual(&self, input: ManualCorrection) -> Result<LearningRecord> {
    let mut correction = NewCorrection::analyzed(
      &input.original_detail,
      &input.corrected_detail,
      input.building_type,
    );
    correction.user_confirmed = true;
    correction.extracted_memo = input.extracted_memo;
    self.save(correction).await.map(|(record, _)| record)
  }

  /// A previously applied correction was accepted downstream.
  pub async fn confirm(
    &self,
    original: &str,
    building_type: BuildingType,
  ) -> Result<Option<LearningRecord>> {
    self
      .repo
      .increment_success_count(original, building_type)
      .await
      .map_err(Error::repository)
  }

  // ── Admin reads ───────────────────────────────────────────────────────────

  pub async fn list(&self, query: &RecordQuery) -> Result<Vec<LearningRecord>> {
    self.repo.list_records(query).await.map_err(Error::repository)
  }

  pub async fn stats(&self) -> Result<LearningStats> {
    self.repo.stats().await.map_err(Error::repository)
  }
}

#[cfg(test)]
mod tests {
  use addrkit_core::{learning::INITIAL_CONFIDENCE, memory::MemoryRepository};

  use super::*;
  use crate::testing::FailingRepository;

  fn seeded(
    original: &str,
    corrected: &str,
    confidence: f64,
    occurrences: u32,
    analyzed: bool,
  ) -> LearningRecord {
    let input = if analyzed {
      NewCorrection::analyzed(original, corrected, BuildingType::Apartment)
    } else {
      NewCorrection::rule(original, corrected, BuildingType::Apartment)
    };
    let mut record = LearningRecord::first_sighting(input, Default::default());
    record.confidence = confidence;
    record.occurrence_count = occurrences;
    record
  }

  fn store_with(records: Vec<LearningRecord>) -> PatternStore<MemoryRepository> {
    let repo = MemoryRepository::new();
    for r in records {
      repo.insert(r);
    }
    PatternStore::new(repo)
  }

  #[tokio::test]
  async fn exact_tier_returns_stored_correction() {
    let store = store_with(vec![seeded("101-1001", "101동 1001호", 0.9, 3, false)]);
    let hit = store.lookup("101-1001", BuildingType::Apartment).await.unwrap();
    assert_eq!(hit.tier, ResolutionSource::Exact);
    assert_eq!(hit.corrected, "101동 1001호");
    assert_eq!(hit.confidence, 0.9);
  }

  #[tokio::test]
  async fn exact_tier_ignores_weak_records() {
    let store = store_with(vec![seeded("101-1001", "101동 1001호", 0.6, 1, false)]);
    assert!(store.lookup("101-1001", BuildingType::Apartment).await.is_none());
  }

  #[tokio::test]
  async fn regex_tier_substitutes_captures() {
    let store = store_with(vec![seeded("101-1001", "101동 1001호", 0.85, 2, true)]);
    let hit = store.lookup("205-302", BuildingType::Apartment).await.unwrap();
    assert_eq!(hit.tier, ResolutionSource::Regex);
    assert_eq!(hit.corrected, "205동 302호");
  }

  #[tokio::test]
  async fn regex_tier_needs_high_confidence() {
    let store = store_with(vec![seeded("101-1001", "101동 1001호", INITIAL_CONFIDENCE - 0.05, 2, true)]);
    assert!(store.lookup("205-302", BuildingType::Apartment).await.is_none());
  }

  #[tokio::test]
  async fn malformed_regex_is_skipped() {
    let mut broken = seeded("9-9", "9동 9호", 0.95, 10, true);
    broken.pattern_regex = Some("^(\\d+-(\\d+$".to_owned());
    let good = seeded("101-1001", "101동 1001호", 0.9, 1, true);
    let store = store_with(vec![broken, good]);

    let hit = store.lookup("205-302", BuildingType::Apartment).await.unwrap();
    assert_eq!(hit.corrected, "205동 302호");
    // Second lookup served from the cache, still skipping the broken entry.
    let hit = store.lookup("7-8", BuildingType::Apartment).await.unwrap();
    assert_eq!(hit.corrected, "7동 8호");
  }

  #[tokio::test]
  async fn fuzzy_tier_scales_confidence_by_similarity() {
    let store = store_with(vec![seeded("101동 1001호.", "101동 1001호", 0.9, 2, false)]);
    let hit = store.lookup("101동 1001호", BuildingType::Apartment).await.unwrap();
    assert_eq!(hit.tier, ResolutionSource::Fuzzy);
    assert_eq!(hit.corrected, "101동 1001호");
    assert!(hit.confidence < 0.9 && hit.confidence >= 0.85 * 0.9);
  }

  #[tokio::test]
  async fn fuzzy_tier_needs_repeat_sightings() {
    let store = store_with(vec![seeded("101동 1001호.", "101동 1001호", 0.9, 1, false)]);
    assert!(store.lookup("101동 1001호", BuildingType::Apartment).await.is_none());
  }

  #[tokio::test]
  async fn lookups_degrade_on_repository_failure() {
    let store = PatternStore::new(FailingRepository);
    assert!(store.lookup("101-1001", BuildingType::Apartment).await.is_none());
    assert!(store.stats().await.is_err());
  }

  #[tokio::test]
  async fn manual_corrections_are_generalized_and_confirmed() {
    let store = PatternStore::new(MemoryRepository::new());
    let record = store
      .save_manual(ManualCorrection {
        original_detail:  "101-1001 문앞".into(),
        corrected_detail: "101동 1001호".into(),
        building_type:    BuildingType::Apartment,
        extracted_memo:   Some("문앞".into()),
      })
      .await
      .unwrap();
    assert!(record.user_confirmed);
    assert!(record.pattern_regex.is_some());
    assert_eq!(record.extracted_memo.as_deref(), Some("문앞"));

    let confirmed = store.confirm("101-1001 문앞", BuildingType::Apartment).await.unwrap();
    assert_eq!(confirmed.unwrap().success_count, 1);
    assert!(store.confirm("없음", BuildingType::Apartment).await.unwrap().is_none());
  }
}
