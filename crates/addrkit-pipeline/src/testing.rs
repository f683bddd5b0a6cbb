//! Scripted collaborators for tests.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use addrkit_core::{
  building::BuildingType,
  learning::{LearningRecord, NewCorrection, Reinforcement},
  store::{LearningStats, PatternRepository, RecordQuery},
};
use uuid::Uuid;

use crate::{
  error::{EscalationError, GeocodeError},
  escalate::{AiEscalator, AiSuggestion, EscalationRequest},
  geocode::{GeocodeCandidate, GeocodeResponse, Geocoder},
};

// ─── Geocoder ────────────────────────────────────────────────────────────────

/// Answers from a fixed table; unknown queries get zero results.
///
/// Clones share the query log.
#[derive(Debug, Default, Clone)]
pub struct FakeGeocoder {
  answers:  HashMap<String, GeocodeResponse>,
  failing:  bool,
  panic_on: Option<String>,
  queries:  Arc<Mutex<Vec<String>>>,
}

impl FakeGeocoder {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, query: &str, response: GeocodeResponse) -> Self {
    self.answers.insert(query.to_owned(), response);
    self
  }

  /// Answer `query` with exactly one candidate.
  pub fn with_single(self, query: &str, candidate: GeocodeCandidate) -> Self {
    self.with(query, GeocodeResponse { total_count: 1, results: vec![candidate] })
  }

  /// Every query fails as if the service were down.
  pub fn failing(mut self) -> Self {
    self.failing = true;
    self
  }

  /// Panic when asked for `query`.
  pub fn panicking_on(mut self, query: &str) -> Self {
    self.panic_on = Some(query.to_owned());
    self
  }

  /// Every query received so far, in order.
  pub fn queries(&self) -> Vec<String> {
    self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl Geocoder for FakeGeocoder {
  async fn search(&self, query: &str) -> Result<GeocodeResponse, GeocodeError> {
    self
      .queries
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(query.to_owned());

    if self.panic_on.as_deref() == Some(query) {
      panic!("scripted geocoder panic for {query:?}");
    }
    if self.failing {
      return Err(GeocodeError::Status(503));
    }
    Ok(self.answers.get(query).cloned().unwrap_or_default())
  }
}

/// A candidate carrying only what classification needs.
pub fn building(road_address: &str, name: Option<&str>, class_code: Option<&str>) -> GeocodeCandidate {
  GeocodeCandidate {
    road_address:        road_address.to_owned(),
    jibun_address:       String::new(),
    zip_code:            "00000".to_owned(),
    building_name:       name.map(str::to_owned),
    building_class_code: class_code.map(str::to_owned),
    sido:                road_address.split_whitespace().next().unwrap_or_default().to_owned(),
    sigungu:             String::new(),
    eupmyeondong:        String::new(),
    road_name:           String::new(),
  }
}

// ─── Escalator ───────────────────────────────────────────────────────────────

/// Replies with one fixed suggestion, or fails every call.
///
/// Clones share the request log.
#[derive(Debug, Clone)]
pub struct FakeEscalator {
  reply:    Option<AiSuggestion>,
  requests: Arc<Mutex<Vec<EscalationRequest>>>,
}

impl FakeEscalator {
  pub fn replying(suggestion: AiSuggestion) -> Self {
    Self { reply: Some(suggestion), requests: Arc::default() }
  }

  pub fn failing() -> Self { Self { reply: None, requests: Arc::default() } }

  pub fn requests(&self) -> Vec<EscalationRequest> {
    self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl AiEscalator for FakeEscalator {
  async fn escalate(&self, request: &EscalationRequest) -> Result<AiSuggestion, EscalationError> {
    self
      .requests
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(request.clone());
    self
      .reply
      .clone()
      .ok_or_else(|| EscalationError::Parse("scripted failure".to_owned()))
  }
}

/// A suggestion with no error flag.
pub fn suggestion(normalized: &str, confidence: f64) -> AiSuggestion {
  AiSuggestion {
    normalized: normalized.to_owned(),
    confidence,
    reasoning: "scripted".to_owned(),
    has_error: false,
    suggested_correction: None,
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("learning store unavailable")]
pub struct Unavailable;

/// A [`PatternRepository`] whose every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRepository;

impl PatternRepository for FailingRepository {
  type Error = Unavailable;

  async fn find_exact(
    &self,
    _original: &str,
    _building_type: BuildingType,
    _min_confidence: f64,
  ) -> Result<Option<LearningRecord>, Unavailable> {
    Err(Unavailable)
  }

  async fn find_regex_candidates(
    &self,
    _building_type: BuildingType,
    _min_confidence: f64,
    _limit: usize,
  ) -> Result<Vec<LearningRecord>, Unavailable> {
    Err(Unavailable)
  }

  async fn find_fuzzy_candidates(
    &self,
    _building_type: BuildingType,
    _min_confidence: f64,
    _min_occurrences: u32,
    _limit: usize,
  ) -> Result<Vec<LearningRecord>, Unavailable> {
    Err(Unavailable)
  }

  async fn upsert_correction(
    &self,
    _input: NewCorrection,
  ) -> Result<(LearningRecord, Reinforcement), Unavailable> {
    Err(Unavailable)
  }

  async fn touch_last_used(&self, _record_id: Uuid) -> Result<(), Unavailable> { Err(Unavailable) }

  async fn increment_success_count(
    &self,
    _original: &str,
    _building_type: BuildingType,
  ) -> Result<Option<LearningRecord>, Unavailable> {
    Err(Unavailable)
  }

  async fn list_records(&self, _query: &RecordQuery) -> Result<Vec<LearningRecord>, Unavailable> {
    Err(Unavailable)
  }

  async fn stats(&self) -> Result<LearningStats, Unavailable> { Err(Unavailable) }
}
