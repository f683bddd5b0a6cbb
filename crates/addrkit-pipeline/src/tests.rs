use std::{sync::Arc, time::Duration};

use addrkit_core::{
  building::BuildingType,
  learning::{LearningRecord, NewCorrection},
  memory::MemoryRepository,
  reason::{ReasonCode, Status},
  resolution::{ResolutionSource, RowInput, RowResolution},
};

use crate::{
  BatchCoordinator,
  Pipeline,
  config::PipelineConfig,
  escalate::AiSuggestion,
  geocode::{GeocodeCandidate, GeocodeResponse},
  patterns::ManualCorrection,
  testing::{FakeEscalator, FakeGeocoder, building, suggestion},
};

type TestPipeline = Pipeline<MemoryRepository, FakeGeocoder, FakeEscalator>;

const TEHERAN: &str = "서울특별시 강남구 테헤란로 152";

fn apartment(road: &str) -> GeocodeCandidate { building(road, Some("래미안아파트"), Some("1")) }

fn office(road: &str) -> GeocodeCandidate { building(road, Some("강남파이낸스센터"), Some("0")) }

/// A geocoder that knows exactly one normalized query.
fn knows(query: &str, candidate: GeocodeCandidate) -> FakeGeocoder {
  FakeGeocoder::new().with_single(query, candidate)
}

fn pipeline(geocoder: FakeGeocoder) -> TestPipeline {
  Pipeline::new(MemoryRepository::new(), geocoder, None, PipelineConfig::default())
}

fn with_ai(geocoder: FakeGeocoder, ai: FakeEscalator) -> TestPipeline {
  let config = PipelineConfig { ai_enabled: true, ..PipelineConfig::default() };
  Pipeline::new(MemoryRepository::new(), geocoder, Some(ai), config)
}

async fn resolve(p: &TestPipeline, address: &str) -> RowResolution {
  p.resolve_row(&RowInput::new(0, address)).await
}

// ─── Rows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bare_number_pair_becomes_dong_ho() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 101 1001", apartment(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 101 1001").await;

  assert_eq!(row.status, Status::Valid);
  assert_eq!(row.reason_code, ReasonCode::Ok);
  assert_eq!(row.standard_address.as_deref(), Some(TEHERAN));
  assert_eq!(row.building_type, Some(BuildingType::Apartment));
  assert_eq!(row.detail.as_deref(), Some("101 1001"));
  assert_eq!(row.normalized_detail.as_deref(), Some("101동 1001호"));
  assert_eq!(row.full_address.as_deref(), Some("서울특별시 강남구 테헤란로 152 101동 1001호"));
  assert_eq!(row.source, Some(ResolutionSource::Rule));
  assert!(!row.flags.is_island_remote);
  assert!(!row.flags.is_length_exceeded);
}

#[tokio::test]
async fn lettered_unit_is_kept_verbatim() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 A-302", apartment(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 A-302").await;

  assert_eq!(row.status, Status::Valid);
  assert_eq!(row.normalized_detail.as_deref(), Some("A-302"));
  // Nothing changed, so nothing is learned.
  assert!(p.patterns().repository().is_empty());
}

#[tokio::test]
async fn delivery_memo_is_split_off_with_a_warning() {
  let query = "서울특별시 강남구 테헤란로 152 101동 1001호 (부재시 문앞)";
  let p = pipeline(knows(query, apartment(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동 1001호 (부재시 문앞)").await;

  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailMixedMemo);
  assert_eq!(row.normalized_detail.as_deref(), Some("101동 1001호"));
  assert_eq!(row.memo.as_deref(), Some("부재시 문앞"));
  assert_eq!(row.full_address.as_deref(), Some("서울특별시 강남구 테헤란로 152 101동 1001호"));
}

#[tokio::test]
async fn apartment_without_detail_is_missing_unit() {
  let p = pipeline(knows(TEHERAN, apartment(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152").await;

  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailMissingUnit);
  assert_eq!(row.detail.as_deref(), Some(""));
  assert_eq!(row.full_address.as_deref(), Some(TEHERAN));
}

#[tokio::test]
async fn basement_shorthand_on_general_building() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 B1", office(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 B1").await;

  assert_eq!(row.status, Status::Valid);
  assert_eq!(row.building_type, Some(BuildingType::General));
  assert_eq!(row.normalized_detail.as_deref(), Some("지하 1층"));
}

#[tokio::test]
async fn placeholder_detail_is_forbidden_even_on_general_building() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 미정", office(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 미정").await;

  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailForbidden);
}

#[tokio::test]
async fn empty_and_short_inputs_never_reach_the_geocoder() {
  let geo = FakeGeocoder::new();
  let p = pipeline(geo.clone());

  let row = resolve(&p, "  , . ").await;
  assert_eq!(row.status, Status::Invalid);
  assert_eq!(row.reason_code, ReasonCode::Empty);

  let row = resolve(&p, "강남").await;
  assert_eq!(row.reason_code, ReasonCode::TooShort);
  assert_eq!(row.standard_address, None);

  assert!(geo.queries().is_empty());
}

#[tokio::test]
async fn geocoder_failure_is_api_error() {
  let p = pipeline(FakeGeocoder::new().failing());
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동 1001호").await;

  assert_eq!(row.status, Status::Invalid);
  assert_eq!(row.reason_code, ReasonCode::ApiError);
  assert_eq!(row.confidence, 0.0);
}

#[tokio::test]
async fn unknown_address_is_base_not_found() {
  let p = pipeline(FakeGeocoder::new());
  let row = resolve(&p, "어딘가 모를 동네 아무 길 77").await;

  assert_eq!(row.status, Status::Invalid);
  assert_eq!(row.reason_code, ReasonCode::BaseNotFound);
}

#[tokio::test]
async fn truncated_retry_hands_dropped_tokens_to_the_detail() {
  let p = pipeline(knows(TEHERAN, apartment(TEHERAN)));
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동 1001호").await;

  assert_eq!(row.detail.as_deref(), Some("101동 1001호"));
  assert_eq!(row.status, Status::Valid);
}

#[tokio::test]
async fn tied_candidates_downgrade_a_valid_row() {
  let query = "서울특별시 강남구 테헤란로 152 101동 1001호";
  let geo = FakeGeocoder::new().with(query, GeocodeResponse {
    total_count: 2,
    results:     vec![apartment(TEHERAN), apartment("서울특별시 강남구 테헤란로 152-1")],
  });
  let row = resolve(&pipeline(geo), "서울 강남구 테헤란로 152 101동 1001호").await;

  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::BaseAmbiguous);
  assert_eq!(row.standard_address.as_deref(), Some(TEHERAN));
  assert!(row.confidence <= 0.5);
}

#[tokio::test]
async fn island_and_length_flags() {
  let jeju = "제주특별자치도 제주시 첨단로 242";
  let p = pipeline(knows("제주특별자치도 제주시 첨단로 242 3층", office(jeju)));
  let row = resolve(&p, "제주 제주시 첨단로 242 3층").await;
  assert!(row.flags.is_island_remote);
  assert!(!row.flags.is_length_exceeded);

  let road = "경상남도 창원시 마산합포구 진전면 양촌리 이명로 1234번길 567-12";
  let p = pipeline(knows(&format!("{road} 101동 1001호"), apartment(road)));
  let row = resolve(&p, "경남 창원시 마산합포구 진전면 양촌리 이명로 1234번길 567-12 101동 1001호").await;
  assert_eq!(row.status, Status::Valid);
  assert!(row.flags.is_length_exceeded);
  assert!(!row.flags.is_island_remote);
}

#[tokio::test]
async fn phone_is_formatted_on_every_row() {
  let p = pipeline(FakeGeocoder::new().failing());
  let row = p
    .resolve_row(&RowInput::new(3, "서울 강남구 테헤란로 152").with_phone("01012345678"))
    .await;

  assert_eq!(row.row_index, 3);
  let phone = row.phone.unwrap();
  assert_eq!(phone.formatted, "010-1234-5678");
  assert!(phone.was_modified);
}

// ─── Learning ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rule_rewrites_are_learned_and_served_exactly_next_time() {
  let query = "서울특별시 강남구 테헤란로 152 101-1001";
  let p = pipeline(knows(query, apartment(TEHERAN)));

  let first = resolve(&p, "서울 강남구 테헤란로 152 101-1001").await;
  assert_eq!(first.source, Some(ResolutionSource::Rule));
  assert_eq!(first.normalized_detail.as_deref(), Some("101동 1001호"));

  let learned = p.patterns().repository().get("101-1001", BuildingType::Apartment).unwrap();
  assert_eq!(learned.corrected_detail, "101동 1001호");

  let second = resolve(&p, "서울 강남구 테헤란로 152 101-1001").await;
  assert_eq!(second.source, Some(ResolutionSource::Exact));
  assert_eq!(second.status, Status::Valid);
  assert_eq!(second.normalized_detail.as_deref(), Some("101동 1001호"));
  assert_eq!(second.confidence, learned.confidence);
}

#[tokio::test]
async fn learned_correction_outranks_the_rules() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 관리사무소", apartment(TEHERAN)));
  p.patterns().repository().insert(LearningRecord::first_sighting(
    NewCorrection::rule("관리사무소", "101동 관리사무소", BuildingType::Apartment),
    Default::default(),
  ));

  let row = resolve(&p, "서울 강남구 테헤란로 152 관리사무소").await;
  assert_eq!(row.status, Status::Valid);
  assert_eq!(row.source, Some(ResolutionSource::Exact));
  assert_eq!(row.normalized_detail.as_deref(), Some("101동 관리사무소"));
}

#[tokio::test]
async fn learned_correction_does_not_hide_content_problems() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 101동 1001호 문앞", apartment(TEHERAN)));
  p.patterns().repository().insert(LearningRecord::first_sighting(
    NewCorrection::rule("101동 1001호 문앞", "101동 1001호", BuildingType::Apartment),
    Default::default(),
  ));

  let row = resolve(&p, "서울 강남구 테헤란로 152 101동 1001호 문앞").await;
  assert_eq!(row.source, Some(ResolutionSource::Exact));
  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailMixedMemo);
  assert_eq!(row.memo.as_deref(), Some("문앞"));
}

#[tokio::test]
async fn generalized_correction_keeps_repeated_numbers_apart() {
  let p = pipeline(knows("서울특별시 강남구 테헤란로 152 102-1503", apartment(TEHERAN)));
  p.patterns()
    .save_manual(ManualCorrection {
      original_detail:  "101-101".into(),
      corrected_detail: "101동 101호".into(),
      building_type:    BuildingType::Apartment,
      extracted_memo:   None,
    })
    .await
    .unwrap();

  let row = resolve(&p, "서울 강남구 테헤란로 152 102-1503").await;
  assert_eq!(row.source, Some(ResolutionSource::Regex));
  assert_eq!(row.normalized_detail.as_deref(), Some("102동 1503호"));
  assert_eq!(row.full_address.as_deref(), Some("서울특별시 강남구 테헤란로 152 102동 1503호"));
}

// ─── Escalation ──────────────────────────────────────────────────────────────

const DONG_ONLY: &str = "서울특별시 강남구 테헤란로 152 101동";

#[tokio::test]
async fn confident_ai_suggestion_is_adopted_and_learned() {
  let ai = FakeEscalator::replying(suggestion("101동 1001호", 0.92));
  let p = with_ai(knows(DONG_ONLY, apartment(TEHERAN)), ai.clone());
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동").await;

  assert_eq!(row.status, Status::Valid);
  assert_eq!(row.source, Some(ResolutionSource::Ai));
  assert_eq!(row.confidence, 0.92);
  assert_eq!(row.normalized_detail.as_deref(), Some("101동 1001호"));

  let requests = ai.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].detail_address, "101동");
  assert_eq!(requests[0].building_type, BuildingType::Apartment);
  assert_eq!(requests[0].building_name.as_deref(), Some("래미안아파트"));

  let learned = p.patterns().repository().get("101동", BuildingType::Apartment).unwrap();
  assert_eq!(learned.corrected_detail, "101동 1001호");
  assert_eq!(learned.problem_description.as_deref(), Some("호수 누락"));
}

#[tokio::test]
async fn lukewarm_ai_suggestion_keeps_the_rule_warning() {
  let ai = FakeEscalator::replying(suggestion("101동 1001호", 0.8));
  let p = with_ai(knows(DONG_ONLY, apartment(TEHERAN)), ai);
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동").await;

  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailMissingHo);
  assert_eq!(row.source, Some(ResolutionSource::Ai));
  assert!(row.message.unwrap().contains("AI 제안: 101동 1001호"));
}

#[tokio::test]
async fn unusable_ai_replies_fall_back_to_the_rules() {
  let flagged = AiSuggestion { has_error: true, ..suggestion("101동 1001호", 0.95) };
  for ai in [
    FakeEscalator::replying(flagged),
    FakeEscalator::replying(suggestion("101동 1001호", 0.6)),
    FakeEscalator::failing(),
  ] {
    let p = with_ai(knows(DONG_ONLY, apartment(TEHERAN)), ai.clone());
    let row = resolve(&p, "서울 강남구 테헤란로 152 101동").await;

    assert_eq!(row.source, Some(ResolutionSource::Rule));
    assert_eq!(row.reason_code, ReasonCode::DetailMissingHo);
    assert_eq!(row.normalized_detail.as_deref(), Some("101동"));
    assert_eq!(ai.requests().len(), 1);
    assert!(p.patterns().repository().is_empty());
  }
}

#[tokio::test]
async fn ai_is_not_consulted_for_valid_details_or_when_disabled() {
  let ai = FakeEscalator::replying(suggestion("무시됨", 0.99));
  let query = "서울특별시 강남구 테헤란로 152 101동 1001호";
  let p = with_ai(knows(query, apartment(TEHERAN)), ai.clone());
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동 1001호").await;
  assert_eq!(row.source, Some(ResolutionSource::Rule));
  assert!(ai.requests().is_empty());

  let ai = FakeEscalator::replying(suggestion("101동 1001호", 0.99));
  let p: TestPipeline = Pipeline::new(
    MemoryRepository::new(),
    knows(DONG_ONLY, apartment(TEHERAN)),
    Some(ai.clone()),
    PipelineConfig::default(),
  );
  assert!(!p.ai_enabled());
  let row = resolve(&p, "서울 강남구 테헤란로 152 101동").await;
  assert_eq!(row.reason_code, ReasonCode::DetailMissingHo);
  assert!(ai.requests().is_empty());
}

#[tokio::test]
async fn ai_fix_for_a_missing_detail_is_not_learned() {
  let ai = FakeEscalator::replying(suggestion("101동 1001호", 0.9));
  let p = with_ai(knows(TEHERAN, apartment(TEHERAN)), ai.clone());
  let row = resolve(&p, "서울 강남구 테헤란로 152").await;

  assert_eq!(row.source, Some(ResolutionSource::Ai));
  assert_eq!(row.normalized_detail.as_deref(), Some("101동 1001호"));
  assert_eq!(ai.requests().len(), 1);
  assert!(p.patterns().repository().is_empty());
}

#[tokio::test]
async fn ai_fix_for_memo_mix_is_learned_with_pattern_and_memo() {
  let ai = FakeEscalator::replying(suggestion("101동 1001호", 0.9));
  let query = "서울특별시 강남구 테헤란로 152 101-1001 문앞";
  let p = with_ai(knows(query, apartment(TEHERAN)), ai);
  let row = resolve(&p, "서울 강남구 테헤란로 152 101-1001 문앞").await;

  assert_eq!(row.source, Some(ResolutionSource::Ai));
  assert_eq!(row.status, Status::Warning);
  assert_eq!(row.reason_code, ReasonCode::DetailMixedMemo);
  assert_eq!(row.memo.as_deref(), Some("문앞"));

  let learned = p.patterns().repository().get("101-1001 문앞", BuildingType::Apartment).unwrap();
  assert!(learned.pattern_regex.is_some());
  assert_eq!(learned.extracted_memo.as_deref(), Some("문앞"));
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_geocoder_reachability() {
  let report = pipeline(FakeGeocoder::new()).health().await;
  assert!(report.geocoder_reachable);
  assert!(!report.ai_enabled);
  assert_eq!(report.message, None);

  let report = with_ai(FakeGeocoder::new().failing(), FakeEscalator::failing()).health().await;
  assert!(!report.geocoder_reachable);
  assert!(report.ai_enabled);
  assert!(report.message.is_some());
}

// ─── Batches ─────────────────────────────────────────────────────────────────

fn coordinator(geocoder: FakeGeocoder) -> BatchCoordinator<MemoryRepository, FakeGeocoder, FakeEscalator> {
  BatchCoordinator::new(Arc::new(pipeline(geocoder)))
}

#[tokio::test]
async fn batch_preserves_order_and_conserves_counts() {
  let geo = FakeGeocoder::new()
    .with_single("서울특별시 강남구 테헤란로 152 101 1001", apartment(TEHERAN))
    .with_single(TEHERAN, apartment(TEHERAN));
  let rows = vec![
    RowInput::new(0, "서울 강남구 테헤란로 152 101 1001"),
    RowInput::new(1, ""),
    RowInput::new(2, "서울 강남구 테헤란로 152"),
    RowInput::new(3, "어딘가 모를 동네 아무 길 77"),
    RowInput::new(4, "서울 강남구 테헤란로 152 101 1001"),
    RowInput::new(5, "강남"),
    RowInput::new(6, "서울 강남구 테헤란로 152 101 1001"),
  ];
  let report = coordinator(geo).run(rows).await;

  let indices: Vec<usize> = report.results.iter().map(|r| r.row_index).collect();
  assert_eq!(indices, (0..7).collect::<Vec<_>>());

  let s = report.summary;
  assert_eq!(s.total, 7);
  assert_eq!(s.valid_count + s.warning_count + s.invalid_count, s.total);
  assert_eq!(s.invalid_count, 3);
  assert_eq!(s.warning_count, 1);
}

#[tokio::test]
async fn empty_batch() {
  let report = coordinator(FakeGeocoder::new()).run(Vec::new()).await;
  assert!(report.results.is_empty());
  assert_eq!(report.summary.total, 0);
}

#[tokio::test]
async fn a_panicking_row_becomes_internal_error() {
  let geo = FakeGeocoder::new()
    .with_single(TEHERAN, office(TEHERAN))
    .panicking_on("서울특별시 강남구 테헤란로 999");
  let rows = vec![
    RowInput::new(0, "서울 강남구 테헤란로 152"),
    RowInput::new(1, "서울 강남구 테헤란로 999").with_phone("0212345678"),
    RowInput::new(2, "서울 강남구 테헤란로 152"),
  ];
  let report = coordinator(geo).run(rows).await;

  assert_eq!(report.results[0].status, Status::Valid);
  assert_eq!(report.results[1].status, Status::Invalid);
  assert_eq!(report.results[1].reason_code, ReasonCode::Internal);
  assert_eq!(report.results[1].row_index, 1);
  assert_eq!(report.results[1].phone.as_ref().unwrap().formatted, "02-1234-5678");
  assert_eq!(report.results[2].status, Status::Valid);
}

#[tokio::test(start_paused = true)]
async fn groups_are_paced() {
  let geo = FakeGeocoder::new().with_single(TEHERAN, office(TEHERAN));
  let rows: Vec<RowInput> = (0..11).map(|i| RowInput::new(i, "서울 강남구 테헤란로 152")).collect();

  let started = tokio::time::Instant::now();
  let report = coordinator(geo).run(rows).await;

  assert_eq!(report.summary.total, 11);
  // Three groups of at most five, two pauses between them.
  assert!(started.elapsed() >= Duration::from_millis(200));
  assert!(started.elapsed() < Duration::from_millis(300));
}
