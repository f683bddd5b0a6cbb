//! Per-row resolution: normalize, resolve the base address, then settle the
//! detail through the learned tiers, the rules and optional AI escalation.

use addrkit_core::{
  building::{BuildingType, classify},
  detail::{normalize_detail, separate_memo},
  extract::extract_detail,
  learning::NewCorrection,
  phone::format_phone,
  reason::{ReasonCode, Status},
  resolution::{DeliveryFlags, ResolutionSource, RowInput, RowResolution},
  store::PatternRepository,
  text::{normalize_address, tokens},
  validate::{ContentIssue, DetailVerdict, check_content, validate_detail},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
  config::PipelineConfig,
  escalate::{AiEscalator, AiSuggestion, EscalationRequest},
  geocode::Geocoder,
  patterns::PatternStore,
  resolver::{MatchConfidence, resolve_base},
};

/// Normalized input shorter than this is rejected before geocoding.
pub const MIN_ADDRESS_CHARS: usize = 5;

/// Fixed query used to probe the geocoder.
pub const HEALTH_QUERY: &str = "서울특별시 종로구 세종대로 209";

/// How the detail stage settled a detail string.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailOutcome {
  pub detail:     String,
  pub normalized: String,
  pub memo:       Option<String>,
  pub status:     Status,
  pub reason:     ReasonCode,
  pub message:    Option<String>,
  pub confidence: f64,
  pub source:     ResolutionSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
  pub geocoder_reachable: bool,
  pub ai_enabled:         bool,
  pub message:            Option<String>,
}

/// The resolution pipeline over its three collaborators.
pub struct Pipeline<R, G, A> {
  patterns: PatternStore<R>,
  geocoder: G,
  ai:       Option<A>,
  config:   PipelineConfig,
}

impl<R, G, A> Pipeline<R, G, A>
where
  R: PatternRepository,
  G: Geocoder,
  A: AiEscalator,
{
  /// `ai` is only consulted while `config.ai_enabled` is set.
  pub fn new(repo: R, geocoder: G, ai: Option<A>, config: PipelineConfig) -> Self {
    Self { patterns: PatternStore::new(repo), geocoder, ai, config }
  }

  pub fn patterns(&self) -> &PatternStore<R> { &self.patterns }

  pub fn config(&self) -> &PipelineConfig { &self.config }

  pub fn ai_enabled(&self) -> bool { self.ai().is_some() }

  fn ai(&self) -> Option<&A> { self.ai.as_ref().filter(|_| self.config.ai_enabled) }

  pub async fn health(&self) -> HealthReport {
    let ai_enabled = self.ai_enabled();
    match self.geocoder.search(HEALTH_QUERY).await {
      Ok(_) => HealthReport { geocoder_reachable: true, ai_enabled, message: None },
      Err(e) => {
        warn!(error = %e, "geocoder health probe failed");
        HealthReport { geocoder_reachable: false, ai_enabled, message: Some(e.to_string()) }
      }
    }
  }

  // ── Rows ──────────────────────────────────────────────────────────────────

  /// Resolve one row. Never fails; every problem becomes the row's verdict.
  #[instrument(skip_all, fields(row = input.row_index))]
  pub async fn resolve_row(&self, input: &RowInput) -> RowResolution {
    let normalized = normalize_address(&input.address);
    if normalized.is_empty() {
      return RowResolution::fatal(input, ReasonCode::Empty, "주소가 비어 있습니다");
    }
    if normalized.chars().count() < MIN_ADDRESS_CHARS {
      return RowResolution::fatal(input, ReasonCode::TooShort, "주소가 너무 짧습니다");
    }

    let base = match resolve_base(&self.geocoder, &normalized, &input.address).await {
      Ok(base) => base,
      Err(e) => {
        debug!(error = %e, "base address unresolved");
        return RowResolution::fatal(input, e.reason_code(), e.message());
      }
    };

    let query_tokens = tokens(&normalized);
    let detail = if base.carried.is_empty() {
      extract_detail(&query_tokens, &base.candidate.road_address)
    } else {
      base.carried.join(" ")
    };

    let candidate = base.candidate;
    let building_type = classify(
      candidate.building_class_code.as_deref(),
      candidate.building_name.as_deref(),
    );
    let outcome = self
      .resolve_detail(&detail, building_type, candidate.building_name.as_deref())
      .await;

    let mut status = outcome.status;
    let mut reason = outcome.reason;
    let mut message = outcome.message;
    let mut confidence = outcome.confidence;
    if status == Status::Valid && base.confidence == MatchConfidence::Low {
      status = Status::Warning;
      reason = ReasonCode::BaseAmbiguous;
      message = Some("기본 주소 후보가 여러 개여서 확인이 필요합니다".to_owned());
      confidence = confidence.min(ReasonCode::BaseAmbiguous.rule_confidence());
    }

    let full_address = if outcome.normalized.is_empty() {
      candidate.road_address.clone()
    } else {
      format!("{} {}", candidate.road_address, outcome.normalized)
    };
    let flags = DeliveryFlags::compute(
      &format!("{} {}", candidate.road_address, candidate.jibun_address),
      Some(&full_address),
      self.config.max_full_address_chars,
    );

    debug!(?status, %reason, source = ?outcome.source, confidence, "row resolved");
    RowResolution {
      row_index: input.row_index,
      status,
      standard_address: Some(candidate.road_address),
      jibun_address: Some(candidate.jibun_address).filter(|j| !j.is_empty()),
      detail: Some(outcome.detail),
      normalized_detail: Some(outcome.normalized),
      full_address: Some(full_address),
      zip_code: Some(candidate.zip_code).filter(|z| !z.is_empty()),
      building_name: candidate.building_name,
      building_type: Some(building_type),
      reason_code: reason,
      message,
      confidence,
      source: Some(outcome.source),
      memo: outcome.memo,
      flags,
      phone: input.phone.as_deref().map(format_phone),
    }
  }

  // ── Details ───────────────────────────────────────────────────────────────

  /// Settle a detail string for a building of class `building_type`.
  ///
  /// Learned tiers first; the rules only run when none hits. Content problems
  /// keep the row at `warning` whichever stage answered.
  pub async fn resolve_detail(
    &self,
    detail: &str,
    building_type: BuildingType,
    building_name: Option<&str>,
  ) -> DetailOutcome {
    let detail = detail.trim();
    let (clean, memo) = separate_memo(detail);
    let content = check_content(detail, building_type);

    if let Some(hit) = self.patterns.lookup(detail, building_type).await {
      let (status, reason, message) = content_verdict(content)
        .unwrap_or((Status::Valid, ReasonCode::Ok, None));
      return DetailOutcome {
        detail: detail.to_owned(),
        normalized: hit.corrected,
        memo,
        status,
        reason,
        message,
        confidence: hit.confidence,
        source: hit.tier,
      };
    }

    let verdict = validate_detail(detail, building_type);
    let normalized = normalize_detail(&clean);

    if !verdict.is_valid()
      && verdict.confidence < self.config.ai_confidence_threshold
      && let Some(ai) = self.ai()
      && let Some(suggestion) = self
        .escalate(ai, detail, &verdict, memo.as_deref(), building_type, building_name)
        .await
    {
      let (status, reason, message) = content_verdict(content).unwrap_or_else(|| {
        if suggestion.confidence >= self.config.ai_valid_confidence {
          (Status::Valid, ReasonCode::Ok, None)
        } else {
          let note = format!(
            "AI 제안: {} (신뢰도 {:.2})",
            suggestion.normalized, suggestion.confidence
          );
          let message = match &verdict.message {
            Some(m) => format!("{m}. {note}"),
            None => note,
          };
          (verdict.reason.status(), verdict.reason, Some(message))
        }
      });
      return DetailOutcome {
        detail: detail.to_owned(),
        normalized: suggestion.normalized,
        memo,
        status,
        reason,
        message,
        confidence: suggestion.confidence,
        source: ResolutionSource::Ai,
      };
    }

    if verdict.is_valid() && normalized != detail {
      self
        .write_back(NewCorrection::rule(detail, &normalized, building_type))
        .await;
    }

    DetailOutcome {
      detail: detail.to_owned(),
      normalized,
      memo,
      status: verdict.reason.status(),
      reason: verdict.reason,
      message: verdict.message,
      confidence: verdict.confidence,
      source: ResolutionSource::Rule,
    }
  }

  /// Ask the model; return its suggestion only if it should be adopted.
  /// Adopted suggestions are learned immediately.
  async fn escalate(
    &self,
    ai: &A,
    detail: &str,
    verdict: &DetailVerdict,
    memo: Option<&str>,
    building_type: BuildingType,
    building_name: Option<&str>,
  ) -> Option<AiSuggestion> {
    let request = EscalationRequest {
      detail_address: detail.to_owned(),
      building_type,
      building_name: building_name.map(str::to_owned),
    };

    let suggestion = match ai.escalate(&request).await {
      Ok(s) => s,
      Err(e) => {
        warn!(error = %e, "ai escalation failed; keeping rule verdict");
        return None;
      }
    };

    if suggestion.has_error
      || suggestion.normalized.is_empty()
      || suggestion.confidence <= verdict.confidence
    {
      debug!(
        ai_confidence = suggestion.confidence,
        rule_confidence = verdict.confidence,
        has_error = suggestion.has_error,
        "ai suggestion not adopted"
      );
      return None;
    }

    // An empty detail is never looked up, so a record keyed on it is dead.
    if !detail.is_empty() && suggestion.normalized != detail {
      let mut correction = NewCorrection::analyzed(detail, &suggestion.normalized, building_type);
      correction.problem_description = verdict.message.clone();
      correction.solution_description =
        Some(suggestion.reasoning.clone()).filter(|r| !r.is_empty());
      correction.extracted_memo = memo.map(str::to_owned);
      self.write_back(correction).await;
    }
    Some(suggestion)
  }

  async fn write_back(&self, correction: NewCorrection) {
    if let Err(e) = self.patterns.save(correction).await {
      warn!(error = %e, "could not learn correction");
    }
  }
}

fn content_verdict(issue: Option<ContentIssue>) -> Option<(Status, ReasonCode, Option<String>)> {
  issue.map(|i| (Status::Warning, i.reason, Some(i.message.to_owned())))
}
