//! Raw address text cleanup.

use std::sync::LazyLock;

use regex::Regex;

/// `(구: ...)`, `(옛 ...)`, `(旧...)` legacy-name annotations.
static LEGACY_NAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\(\s*(?:구\s*:|옛|旧)[^)]*\)").unwrap());

static PUNCTUATION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[·,/.;:]").unwrap());

static HYPHEN_SPACING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s*-\s*").unwrap());

static WHITESPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Short region names expanded when they lead the address.
const REGION_ABBREVIATIONS: &[(&str, &str)] = &[
  ("서울", "서울특별시"),
  ("서울시", "서울특별시"),
  ("부산", "부산광역시"),
  ("부산시", "부산광역시"),
  ("대구", "대구광역시"),
  ("대구시", "대구광역시"),
  ("인천", "인천광역시"),
  ("인천시", "인천광역시"),
  ("광주", "광주광역시"),
  ("광주시", "광주광역시"),
  ("대전", "대전광역시"),
  ("대전시", "대전광역시"),
  ("울산", "울산광역시"),
  ("울산시", "울산광역시"),
  ("세종", "세종특별자치시"),
  ("세종시", "세종특별자치시"),
  ("경기", "경기도"),
  ("강원", "강원특별자치도"),
  ("강원도", "강원특별자치도"),
  ("충북", "충청북도"),
  ("충남", "충청남도"),
  ("전북", "전북특별자치도"),
  ("전라북도", "전북특별자치도"),
  ("전남", "전라남도"),
  ("경북", "경상북도"),
  ("경남", "경상남도"),
  ("제주", "제주특별자치도"),
  ("제주도", "제주특별자치도"),
];

/// Clean a raw address line.
///
/// Idempotent: a second pass over the output returns it unchanged.
pub fn normalize_address(raw: &str) -> String {
  let s = LEGACY_NAME.replace_all(raw, " ");
  let s = PUNCTUATION.replace_all(&s, " ");
  let s = HYPHEN_SPACING.replace_all(&s, "-");
  let s = WHITESPACE.replace_all(&s, " ");
  let s = s.trim();

  let mut tokens = s.split(' ');
  let Some(first) = tokens.next() else {
    return String::new();
  };

  match REGION_ABBREVIATIONS.iter().find(|(short, _)| *short == first) {
    Some((_, full)) => {
      let rest: Vec<&str> = tokens.collect();
      if rest.is_empty() {
        (*full).to_owned()
      } else {
        format!("{full} {}", rest.join(" "))
      }
    }
    None => s.to_owned(),
  }
}

/// Whitespace-separated tokens of an already-normalized address.
pub fn tokens(normalized: &str) -> Vec<&str> { normalized.split_whitespace().collect() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collapses_whitespace_and_punctuation() {
    assert_eq!(
      normalize_address("  서울특별시,  강남구 /테헤란로.152 "),
      "서울특별시 강남구 테헤란로 152"
    );
  }

  #[test]
  fn tightens_hyphens() {
    assert_eq!(normalize_address("테헤란로 152 101 - 1001"), "테헤란로 152 101-1001");
  }

  #[test]
  fn strips_legacy_names() {
    assert_eq!(
      normalize_address("강원 홍천군 (구: 화촌면) 장남이길 5"),
      "강원특별자치도 홍천군 장남이길 5"
    );
    assert_eq!(normalize_address("중구 세종대로 110 (옛 시청)"), "중구 세종대로 110");
  }

  #[test]
  fn expands_leading_region_only() {
    assert_eq!(normalize_address("서울 중구 세종대로 110"), "서울특별시 중구 세종대로 110");
    assert_eq!(normalize_address("중구 서울 110"), "중구 서울 110");
    assert_eq!(normalize_address("서울"), "서울특별시");
  }

  #[test]
  fn idempotent_after_first_pass() {
    for raw in [
      "서울 강남구  테헤란로 152, 101 - 1001",
      "부산시 해운대구 (구:우동) 센텀로 1",
      "",
      "   ",
    ] {
      let once = normalize_address(raw);
      assert_eq!(normalize_address(&once), once, "input: {raw:?}");
    }
  }
}
