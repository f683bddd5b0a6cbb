//! Standard address resolution: one geocoder query, candidate scoring and a
//! single truncated retry.

use addrkit_core::{reason::ReasonCode, text::tokens};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  error::GeocodeError,
  geocode::{GeocodeCandidate, Geocoder},
};

const TOKEN_HIT_SCORE: u32 = 10;
const BUILDING_NAME_SCORE: u32 = 20;
const CONFIDENT_SCORE: u32 = 20;
const CONFIDENT_GAP: u32 = 10;
/// The truncated retry never drops below this many leading tokens.
const MIN_RETRY_TOKENS: usize = 3;
const RETRY_DROPPED_TOKENS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
  Low,
  Medium,
  High,
}

/// The chosen standard address.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBase {
  pub candidate:  GeocodeCandidate,
  pub confidence: MatchConfidence,
  /// Trailing query tokens dropped by the truncated retry. They belong to the
  /// detail rather than the base address.
  pub carried:    Vec<String>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("no standard address matches the query")]
  NotFound,

  #[error(transparent)]
  Api(#[from] GeocodeError),
}

impl ResolveError {
  pub fn reason_code(&self) -> ReasonCode {
    match self {
      Self::NotFound => ReasonCode::BaseNotFound,
      Self::Api(_) => ReasonCode::ApiError,
    }
  }

  /// Row-facing message.
  pub fn message(&self) -> String {
    match self {
      Self::NotFound => "기본 주소를 찾을 수 없습니다".to_owned(),
      Self::Api(e) => format!("주소 검색 서비스 오류: {e}"),
    }
  }
}

/// Resolve `normalized` to a standard address. `raw` is the untouched input,
/// searched for candidate building names.
pub async fn resolve_base<G: Geocoder>(
  geocoder: &G,
  normalized: &str,
  raw: &str,
) -> Result<ResolvedBase, ResolveError> {
  let query_tokens = tokens(normalized);

  let response = geocoder.search(normalized).await.inspect_err(|e| {
    warn!(error = %e, "geocoder request failed");
  })?;
  if !response.results.is_empty() {
    let (candidate, confidence) = choose(response.results, &query_tokens, raw);
    return Ok(ResolvedBase { candidate, confidence, carried: Vec::new() });
  }

  let keep = MIN_RETRY_TOKENS.max(query_tokens.len().saturating_sub(RETRY_DROPPED_TOKENS));
  if keep >= query_tokens.len() {
    return Err(ResolveError::NotFound);
  }

  let truncated = query_tokens[..keep].join(" ");
  debug!(query = %truncated, "retrying with truncated query");
  let response = geocoder.search(&truncated).await.inspect_err(|e| {
    warn!(error = %e, "geocoder retry failed");
  })?;
  if response.results.is_empty() {
    return Err(ResolveError::NotFound);
  }

  let (candidate, confidence) = choose(response.results, &query_tokens[..keep], raw);
  Ok(ResolvedBase {
    candidate,
    confidence: confidence.min(MatchConfidence::Medium),
    carried: query_tokens[keep..].iter().map(|t| (*t).to_owned()).collect(),
  })
}

/// Score for one candidate against the query.
pub fn score(candidate: &GeocodeCandidate, query_tokens: &[&str], raw: &str) -> u32 {
  let token_hits = query_tokens
    .iter()
    .filter(|t| candidate.road_address.contains(**t))
    .count() as u32;
  let name_hit = candidate
    .building_name
    .as_deref()
    .is_some_and(|name| raw.contains(name));

  token_hits * TOKEN_HIT_SCORE + if name_hit { BUILDING_NAME_SCORE } else { 0 }
}

fn choose(
  mut candidates: Vec<GeocodeCandidate>,
  query_tokens: &[&str],
  raw: &str,
) -> (GeocodeCandidate, MatchConfidence) {
  if candidates.len() == 1 {
    return (candidates.remove(0), MatchConfidence::High);
  }

  let mut scored: Vec<(u32, GeocodeCandidate)> = candidates
    .into_iter()
    .map(|c| (score(&c, query_tokens, raw), c))
    .collect();
  // Stable: among equal scores the geocoder's own order wins.
  scored.sort_by(|a, b| b.0.cmp(&a.0));

  let top = scored[0].0;
  let runner_up = scored[1].0;
  let confidence = if top < CONFIDENT_SCORE || top - runner_up < CONFIDENT_GAP {
    MatchConfidence::Low
  } else {
    MatchConfidence::Medium
  };
  debug!(top, runner_up, ?confidence, "scored geocoder candidates");

  (scored.swap_remove(0).1, confidence)
}
