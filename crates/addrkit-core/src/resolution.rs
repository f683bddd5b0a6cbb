//! Per-row input and verdict types, delivery flags and batch totals.

use serde::{Deserialize, Serialize};

use crate::{
  building::BuildingType,
  phone::{PhoneResult, format_phone},
  reason::{ReasonCode, Status},
};

/// Longest full address, in characters, that fits a shipping label.
pub const MAX_FULL_ADDRESS_CHARS: usize = 50;

/// Region names served by island or remote-area delivery surcharges.
pub const ISLAND_REGIONS: &[&str] = &[
  "제주",
  "울릉",
  "독도",
  "옹진군",
  "신안군",
  "완도군",
  "진도군",
  "백령",
  "연평",
  "대청면",
  "덕적",
  "흑산",
  "거문도",
  "추자",
  "가파",
  "마라도",
];

/// One row of a validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInput {
  #[serde(default)]
  pub row_index: usize,
  pub address:   String,
  #[serde(default)]
  pub phone:     Option<String>,
}

impl RowInput {
  pub fn new(row_index: usize, address: impl Into<String>) -> Self {
    Self { row_index, address: address.into(), phone: None }
  }

  pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
    self.phone = Some(phone.into());
    self
  }
}

/// Which stage produced a row's detail verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
  Exact,
  Regex,
  Fuzzy,
  Rule,
  Ai,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFlags {
  pub is_island_remote:   bool,
  pub is_length_exceeded: bool,
}

impl DeliveryFlags {
  /// `region_text` is searched for remote-region names; `full_address` is
  /// measured against `max_chars`.
  pub fn compute(region_text: &str, full_address: Option<&str>, max_chars: usize) -> Self {
    Self {
      is_island_remote:   is_island_remote(region_text),
      is_length_exceeded: full_address.is_some_and(|a| a.chars().count() > max_chars),
    }
  }
}

pub fn is_island_remote(text: &str) -> bool { ISLAND_REGIONS.iter().any(|r| text.contains(r)) }

/// The verdict for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResolution {
  pub row_index:         usize,
  pub status:            Status,
  pub standard_address:  Option<String>,
  pub jibun_address:     Option<String>,
  pub detail:            Option<String>,
  pub normalized_detail: Option<String>,
  pub full_address:      Option<String>,
  pub zip_code:          Option<String>,
  pub building_name:     Option<String>,
  pub building_type:     Option<BuildingType>,
  pub reason_code:       ReasonCode,
  pub message:           Option<String>,
  pub confidence:        f64,
  pub source:            Option<ResolutionSource>,
  /// Delivery memo split off the detail, if any.
  pub memo:              Option<String>,
  pub flags:             DeliveryFlags,
  pub phone:             Option<PhoneResult>,
}

impl RowResolution {
  /// A row that stopped before the detail stage.
  pub fn fatal(input: &RowInput, reason: ReasonCode, message: impl Into<String>) -> Self {
    Self {
      row_index:         input.row_index,
      status:            Status::Invalid,
      standard_address:  None,
      jibun_address:     None,
      detail:            None,
      normalized_detail: None,
      full_address:      None,
      zip_code:          None,
      building_name:     None,
      building_type:     None,
      reason_code:       reason,
      message:           Some(message.into()),
      confidence:        0.0,
      source:            None,
      memo:              None,
      flags:             DeliveryFlags::compute(&input.address, None, usize::MAX),
      phone:             input.phone.as_deref().map(format_phone),
    }
  }
}

// ─── Batch totals ────────────────────────────────────────────────────────────

/// Aggregate counts over a batch. `valid + warning + invalid == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
  pub total:                 usize,
  pub valid_count:           usize,
  pub warning_count:         usize,
  pub invalid_count:         usize,
  pub island_remote_count:   usize,
  pub length_exceeded_count: usize,
}

impl BatchSummary {
  pub fn tally(results: &[RowResolution]) -> Self {
    results.iter().fold(Self::default(), |mut s, r| {
      s.total += 1;
      match r.status {
        Status::Valid => s.valid_count += 1,
        Status::Warning => s.warning_count += 1,
        Status::Invalid => s.invalid_count += 1,
      }
      s.island_remote_count += usize::from(r.flags.is_island_remote);
      s.length_exceeded_count += usize::from(r.flags.is_length_exceeded);
      s
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn island_flag_is_substring_based() {
    assert!(is_island_remote("제주특별자치도 제주시 첨단로 242"));
    assert!(is_island_remote("경상북도 울릉군 울릉읍 도동리"));
    assert!(!is_island_remote("서울특별시 강남구 테헤란로 152"));
  }

  #[test]
  fn length_flag_counts_chars_not_bytes() {
    let short = "서울특별시 강남구 테헤란로 152 101동 1001호";
    assert!(!DeliveryFlags::compute(short, Some(short), MAX_FULL_ADDRESS_CHARS).is_length_exceeded);

    let long = "가".repeat(51);
    assert!(DeliveryFlags::compute("", Some(&long), MAX_FULL_ADDRESS_CHARS).is_length_exceeded);
    assert!(!DeliveryFlags::compute("", None, MAX_FULL_ADDRESS_CHARS).is_length_exceeded);
  }

  #[test]
  fn fatal_rows_are_invalid_and_keep_island_flag() {
    let input = RowInput::new(3, "제주 어딘가").with_phone("01012345678");
    let r = RowResolution::fatal(&input, ReasonCode::BaseNotFound, "주소를 찾을 수 없습니다");
    assert_eq!(r.status, Status::Invalid);
    assert_eq!(r.row_index, 3);
    assert!(r.flags.is_island_remote);
    assert_eq!(r.phone.unwrap().formatted, "010-1234-5678");
  }

  #[test]
  fn summary_conserves_rows() {
    assert_eq!(BatchSummary::tally(&[]), BatchSummary::default());

    let input = RowInput::new(0, "제주");
    let mut rows = vec![RowResolution::fatal(&input, ReasonCode::Empty, "비어 있음")];
    let mut warn = rows[0].clone();
    warn.status = Status::Warning;
    let mut ok = rows[0].clone();
    ok.status = Status::Valid;
    rows.extend([warn, ok.clone(), ok]);

    let s = BatchSummary::tally(&rows);
    assert_eq!(s.total, 4);
    assert_eq!(s.valid_count + s.warning_count + s.invalid_count, s.total);
    assert_eq!(s.valid_count, 2);
    assert_eq!(s.island_remote_count, 4);
  }

  #[test]
  fn wire_shape_is_camel_case() {
    let r = RowResolution::fatal(&RowInput::new(0, "x"), ReasonCode::TooShort, "짧음");
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["reasonCode"], "E_TOO_SHORT");
    assert_eq!(json["status"], "invalid");
    assert_eq!(json["flags"]["isLengthExceeded"], false);
  }
}
