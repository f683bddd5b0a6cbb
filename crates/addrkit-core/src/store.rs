//! The `PatternRepository` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `addrkit-store-sqlite`
//! and [`crate::memory::MemoryRepository`]). The pipeline depends on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  building::BuildingType,
  learning::{LearningRecord, NewCorrection, Reinforcement},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`PatternRepository::list_records`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
  pub building_type: Option<BuildingType>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// Aggregate counters over the learning store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
  pub total_records:           u64,
  pub apartment_records:       u64,
  pub quasi_apartment_records: u64,
  pub general_records:         u64,
  pub pattern_records:         u64,
  pub user_confirmed_records:  u64,
  pub total_occurrences:       u64,
  pub average_confidence:      f64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persisted learning store.
///
/// Records are keyed by `(original_detail, building_type)`. Writes go through
/// [`upsert_correction`](Self::upsert_correction), which applies the
/// reinforcement rules of [`LearningRecord::reinforce`].
///
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded runtime.
pub trait PatternRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Exact lookup by natural key, restricted to `confidence >= min_confidence`.
  fn find_exact<'a>(
    &'a self,
    original: &'a str,
    building_type: BuildingType,
    min_confidence: f64,
  ) -> impl Future<Output = Result<Option<LearningRecord>, Self::Error>> + Send + 'a;

  /// Records with a non-null `pattern_regex`, most frequent first.
  fn find_regex_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LearningRecord>, Self::Error>> + Send + '_;

  /// Fuzzy-match candidates, most frequent first.
  fn find_fuzzy_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    min_occurrences: u32,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LearningRecord>, Self::Error>> + Send + '_;

  /// Insert a first sighting or reinforce the existing record for the key.
  fn upsert_correction(
    &self,
    input: NewCorrection,
  ) -> impl Future<Output = Result<(LearningRecord, Reinforcement), Self::Error>> + Send + '_;

  /// Bump `last_used_at` on a record that just answered a lookup.
  fn touch_last_used(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a downstream confirmation. Returns `None` for an unknown key.
  fn increment_success_count<'a>(
    &'a self,
    original: &'a str,
    building_type: BuildingType,
  ) -> impl Future<Output = Result<Option<LearningRecord>, Self::Error>> + Send + 'a;

  /// Page through stored records, most frequent first.
  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<LearningRecord>, Self::Error>> + Send + 'a;

  fn stats(&self) -> impl Future<Output = Result<LearningStats, Self::Error>> + Send + '_;
}
