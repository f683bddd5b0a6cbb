//! In-memory [`PatternRepository`] for tests and ephemeral runs.

use std::{
  collections::HashMap,
  convert::Infallible,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  building::BuildingType,
  learning::{LearningRecord, NewCorrection, Reinforcement},
  store::{LearningStats, PatternRepository, RecordQuery},
};

type Key = (String, BuildingType);

/// A learning store held in a `HashMap`; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRepository {
  records: Mutex<HashMap<Key, LearningRecord>>,
}

impl MemoryRepository {
  pub fn new() -> Self { Self::default() }

  /// Seed a fully-built record, replacing any record with the same key.
  pub fn insert(&self, record: LearningRecord) {
    let key = (record.original_detail.clone(), record.building_type);
    self.lock().insert(key, record);
  }

  pub fn get(&self, original: &str, building_type: BuildingType) -> Option<LearningRecord> {
    self.lock().get(&(original.to_owned(), building_type)).cloned()
  }

  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  fn lock(&self) -> MutexGuard<'_, HashMap<Key, LearningRecord>> {
    self.records.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn by_frequency<F>(&self, filter: F, limit: usize) -> Vec<LearningRecord>
  where
    F: Fn(&LearningRecord) -> bool,
  {
    let mut out: Vec<LearningRecord> =
      self.lock().values().filter(|r| filter(r)).cloned().collect();
    out.sort_by(|a, b| {
      b.occurrence_count
        .cmp(&a.occurrence_count)
        .then_with(|| a.created_at.cmp(&b.created_at))
    });
    out.truncate(limit);
    out
  }
}

impl PatternRepository for MemoryRepository {
  type Error = Infallible;

  async fn find_exact(
    &self,
    original: &str,
    building_type: BuildingType,
    min_confidence: f64,
  ) -> Result<Option<LearningRecord>, Infallible> {
    Ok(
      self
        .get(original.trim(), building_type)
        .filter(|r| r.confidence >= min_confidence),
    )
  }

  async fn find_regex_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    limit: usize,
  ) -> Result<Vec<LearningRecord>, Infallible> {
    Ok(self.by_frequency(
      |r| {
        r.building_type == building_type
          && r.pattern_regex.is_some()
          && r.confidence >= min_confidence
      },
      limit,
    ))
  }

  async fn find_fuzzy_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    min_occurrences: u32,
    limit: usize,
  ) -> Result<Vec<LearningRecord>, Infallible> {
    Ok(self.by_frequency(
      |r| {
        r.building_type == building_type
          && r.confidence >= min_confidence
          && r.occurrence_count >= min_occurrences
      },
      limit,
    ))
  }

  async fn upsert_correction(
    &self,
    input: NewCorrection,
  ) -> Result<(LearningRecord, Reinforcement), Infallible> {
    let now = Utc::now();
    let key = (input.original_detail.clone(), input.building_type());
    let mut records = self.lock();

    match records.get_mut(&key) {
      Some(existing) => {
        let outcome = existing.reinforce(input, now);
        Ok((existing.clone(), outcome))
      }
      None => {
        let record = LearningRecord::first_sighting(input, now);
        records.insert(key, record.clone());
        Ok((record, Reinforcement::Inserted))
      }
    }
  }

  async fn touch_last_used(&self, record_id: Uuid) -> Result<(), Infallible> {
    if let Some(r) = self.lock().values_mut().find(|r| r.record_id == record_id) {
      r.last_used_at = Utc::now();
    }
    Ok(())
  }

  async fn increment_success_count(
    &self,
    original: &str,
    building_type: BuildingType,
  ) -> Result<Option<LearningRecord>, Infallible> {
    let mut records = self.lock();
    Ok(records.get_mut(&(original.trim().to_owned(), building_type)).map(|r| {
      r.record_success(Utc::now());
      r.clone()
    }))
  }

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<LearningRecord>, Infallible> {
    let all = self.by_frequency(
      |r| query.building_type.is_none_or(|bt| r.building_type == bt),
      usize::MAX,
    );
    Ok(
      all
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(100))
        .collect(),
    )
  }

  async fn stats(&self) -> Result<LearningStats, Infallible> {
    let records = self.lock();
    let mut stats = LearningStats::default();
    let mut confidence_sum = 0.0;

    for r in records.values() {
      stats.total_records += 1;
      match r.building_type {
        BuildingType::Apartment => stats.apartment_records += 1,
        BuildingType::QuasiApartment => stats.quasi_apartment_records += 1,
        BuildingType::General => stats.general_records += 1,
      }
      if r.pattern_regex.is_some() {
        stats.pattern_records += 1;
      }
      if r.user_confirmed {
        stats.user_confirmed_records += 1;
      }
      stats.total_occurrences += u64::from(r.occurrence_count);
      confidence_sum += r.confidence;
    }

    if stats.total_records > 0 {
      stats.average_confidence = confidence_sum / stats.total_records as f64;
    }
    Ok(stats)
  }
}
