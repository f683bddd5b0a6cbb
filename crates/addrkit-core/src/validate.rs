//! Rule-based detail validation.
//!
//! Content checks run first and apply to every building class. Only when the
//! content is clean does the class-specific structural check decide between
//! valid and a missing-unit verdict.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{building::BuildingType, reason::ReasonCode};

/// Keywords that mark a delivery memo mixed into the detail address.
pub const MEMO_KEYWORDS: &[&str] = &[
  "부재시",
  "문앞",
  "경비실",
  "택배함",
  "연락주세요",
  "현관비밀번호",
  "공동현관",
];

/// Placeholder words that never form a real detail address.
const FORBIDDEN_WORDS: &[&str] = &["미정", "테스트", "TEST", "모름", "주소없음"];

/// "No detail address" phrases; only forbidden where a unit is expected.
const NO_DETAIL_PHRASES: &[&str] = &["상세주소없음", "상세없음", "없음", "해당없음"];

/// Highest unit or floor number accepted as plausible.
pub const MAX_UNIT_NUMBER: u32 = 9999;

static FORBIDDEN_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[<>{}\[\]\\|^`$\p{Cc}\u{FFFD}]").unwrap());

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(?:[xX]+|0+|-+|\?+)$|[xX]{2,}|[?]{2,}").unwrap()
});

pub(crate) static PHONE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:01[016789]|0\d{1,2})[-\s]?\d{3,4}[-\s]?\d{4}").unwrap()
});

/// Numbers in unit position: before 호/층/F, after a hyphen, or the second of
/// a bare `N M` pair.
static UNIT_NUMBERS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(\d+)\s*(?:호|층|[Ff]\b)|\d\s*-\s*(\d+)|^\s*\d+\s+(\d+)\s*$").unwrap()
});

/// `101동 1001호`, `101-1001`, `A-302`, `101 1001`, `B동 201호`.
static APT_COMBINED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^(?:[A-Za-z]{1,2}\d{0,4}|\d{1,4}[A-Za-z]?|[가-힣])\s*(?:동|-|\s)\s*\d{1,5}\s*호?",
  )
  .unwrap()
});

static DONG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:\d+|[A-Za-z]|[가-힣])\s*동").unwrap());

static HO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s*호").unwrap());

static FLOOR_OR_ROOM: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:지하|[Bb])\s*\d+|\d+\s*(?:층|[Ff]\b|호)").unwrap()
});

/// Outcome of [`validate_detail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailVerdict {
  pub reason:     ReasonCode,
  pub message:    Option<String>,
  pub confidence: f64,
  /// `true` when a content check, not the structural rule, decided.
  pub content:    bool,
}

impl DetailVerdict {
  fn valid() -> Self {
    Self {
      reason:     ReasonCode::Ok,
      message:    None,
      confidence: ReasonCode::Ok.rule_confidence(),
      content:    false,
    }
  }

  fn invalid(reason: ReasonCode, message: &str, content: bool) -> Self {
    Self {
      reason,
      message: Some(message.to_owned()),
      confidence: reason.rule_confidence(),
      content,
    }
  }

  pub fn is_valid(&self) -> bool { self.reason == ReasonCode::Ok }
}

/// A content problem found before structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentIssue {
  pub reason:  ReasonCode,
  pub message: &'static str,
}

/// Whether `s` carries a delivery-memo keyword (spacing ignored).
pub fn contains_memo_keyword(s: &str) -> bool {
  let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
  MEMO_KEYWORDS.iter().any(|k| compact.contains(k))
}

/// Whether `s` embeds something shaped like a phone number.
pub fn contains_phone_number(s: &str) -> bool { PHONE_NUMBER.is_match(s) }

/// Run the class-independent content checks, in priority order.
pub fn check_content(detail: &str, building: BuildingType) -> Option<ContentIssue> {
  let detail = detail.trim();
  if detail.is_empty() {
    return None;
  }

  if FORBIDDEN_CHARS.is_match(detail) {
    return Some(ContentIssue {
      reason:  ReasonCode::DetailInvalidChars,
      message: "상세주소에 허용되지 않는 문자가 포함되어 있습니다",
    });
  }

  if is_placeholder(detail, building) {
    return Some(ContentIssue {
      reason:  ReasonCode::DetailForbidden,
      message: "상세주소가 유효하지 않은 값입니다",
    });
  }

  if contains_phone_number(detail) || contains_memo_keyword(detail) {
    return Some(ContentIssue {
      reason:  ReasonCode::DetailMixedMemo,
      message: "상세주소에 배송 메모 또는 연락처가 섞여 있습니다",
    });
  }

  if has_suspect_unit(detail) {
    return Some(ContentIssue {
      reason:  ReasonCode::DetailSuspectUnit,
      message: "동/호수 번호가 비정상적입니다",
    });
  }

  None
}

fn is_placeholder(detail: &str, building: BuildingType) -> bool {
  let compact: String = detail
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect::<String>()
    .to_uppercase();

  if FORBIDDEN_WORDS.iter().any(|w| compact.contains(w)) || PLACEHOLDER.is_match(&compact) {
    return true;
  }

  building == BuildingType::Apartment && NO_DETAIL_PHRASES.iter().any(|p| compact.contains(p))
}

fn has_suspect_unit(detail: &str) -> bool {
  UNIT_NUMBERS.captures_iter(detail).any(|caps| {
    caps
      .iter()
      .skip(1)
      .flatten()
      .filter_map(|m| m.as_str().parse::<u64>().ok())
      .any(|n| n == 0 || n > u64::from(MAX_UNIT_NUMBER))
  })
}

/// Validate a detail string against the expectations of its building class.
pub fn validate_detail(detail: &str, building: BuildingType) -> DetailVerdict {
  if let Some(issue) = check_content(detail, building) {
    return DetailVerdict::invalid(issue.reason, issue.message, true);
  }
  validate_structure(detail.trim(), building)
}

fn validate_structure(detail: &str, building: BuildingType) -> DetailVerdict {
  if detail.is_empty() {
    return match building {
      BuildingType::Apartment => {
        DetailVerdict::invalid(ReasonCode::DetailMissingUnit, "동/호 누락", false)
      }
      BuildingType::QuasiApartment => {
        DetailVerdict::invalid(ReasonCode::DetailMissingUnit, "호 누락", false)
      }
      BuildingType::General => DetailVerdict::valid(),
    };
  }

  match building {
    BuildingType::Apartment => {
      let has_ho = HO.is_match(detail);
      if APT_COMBINED.is_match(detail) || has_ho {
        // A 호 on its own, or together with a 동, is a complete unit.
        DetailVerdict::valid()
      } else if DONG.is_match(detail) || detail.contains('동') {
        DetailVerdict::invalid(ReasonCode::DetailMissingHo, "호수 누락", false)
      } else {
        DetailVerdict::invalid(ReasonCode::DetailMissingUnit, "동/호 누락", false)
      }
    }
    BuildingType::QuasiApartment => {
      if APT_COMBINED.is_match(detail)
        || FLOOR_OR_ROOM.is_match(detail)
        || detail.chars().count() >= 2
      {
        DetailVerdict::valid()
      } else {
        DetailVerdict::invalid(ReasonCode::DetailMissingUnit, "호 누락", false)
      }
    }
    BuildingType::General => DetailVerdict::valid(),
  }
}
