//! Surface-form rewrites for detail addresses.
//!
//! Each rewrite is an independent substitution applied in a fixed order. The
//! output of [`normalize_detail`] is a fixed point: normalizing it again
//! returns it unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::validate::{MEMO_KEYWORDS, PHONE_NUMBER};

/// `101-1001`, `101 - 1001호`
static PURE_HYPHEN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s*(\d+)\s*호?$").unwrap());

/// `101 1001`
static PURE_SPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(\d+)\s+(\d+)$").unwrap());

/// A non-leading `N-M`, with whatever follows it. A further hyphen means a
/// phone-like run, which is left alone.
static EMBEDDED_HYPHEN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\s)(\d+)-(\d+)(\s*동|\s*호|-)?").unwrap());

/// `101동 1001` at the end of the string.
static TRAILING_UNIT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d+[A-Za-z]*동\s*)(\d+)$").unwrap());

/// Any memo keyword, with whitespace allowed between its characters.
static MEMO_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
  let alternatives: Vec<String> = MEMO_KEYWORDS
    .iter()
    .map(|k| k.chars().map(|c| regex::escape(&c.to_string())).collect::<Vec<_>>().join(r"\s*"))
    .collect();
  Regex::new(&alternatives.join("|")).unwrap()
});

/// `B1`, `b2`, `B1F`; the capture group detects `B1층`, `B1동`, `B101`.
static BASEMENT_B: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b[Bb](\d{1,2})(?:(층|동|호|-|\d)|[Ff])?").unwrap());

/// `지하1`, `지하 2`, `지하1F`
static BASEMENT_BARE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"지하(\s*)(\d+)(?:(층|호|동)|[Ff])?").unwrap());

/// `3F`, `12f`
static FLOOR_F: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d+)[Ff]([A-Za-z])?").unwrap());

static WHITESPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Produce the normalized display form of a detail string.
pub fn normalize_detail(detail: &str) -> String {
  let s = WHITESPACE.replace_all(detail.trim(), " ").into_owned();

  let s = PURE_HYPHEN.replace(&s, "${1}동 ${2}호").into_owned();
  let s = PURE_SPACE.replace(&s, "${1}동 ${2}호").into_owned();

  let s = EMBEDDED_HYPHEN
    .replace_all(&s, |caps: &Captures<'_>| match caps.get(4).map(|m| m.as_str().trim()) {
      Some("동" | "-") => caps[0].to_owned(),
      _ => format!("{}{}동 {}호", &caps[1], &caps[2], &caps[3]),
    })
    .into_owned();

  let s = TRAILING_UNIT.replace(&s, "${1}${2}호").into_owned();

  let s = BASEMENT_B
    .replace_all(&s, |caps: &Captures<'_>| match caps.get(2) {
      Some(_) => caps[0].to_owned(),
      None => format!("지하 {}층", &caps[1]),
    })
    .into_owned();

  let s = BASEMENT_BARE
    .replace_all(&s, |caps: &Captures<'_>| match caps.get(3) {
      Some(_) => caps[0].to_owned(),
      None => format!("지하{}{}층", &caps[1], &caps[2]),
    })
    .into_owned();

  let s = FLOOR_F
    .replace_all(&s, |caps: &Captures<'_>| {
      let start = caps.get(0).map_or(0, |m| m.start());
      if caps.get(2).is_some() || s[..start].contains('층') {
        caps[0].to_owned()
      } else {
        format!("{}층", &caps[1])
      }
    })
    .into_owned();

  WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Split a delivery memo (or embedded phone number) off a detail string.
///
/// Returns the detail without the memo and, when one was found, the memo
/// text with surrounding brackets removed.
pub fn separate_memo(detail: &str) -> (String, Option<String>) {
  let keyword_at = MEMO_KEYWORD.find(detail).map(|m| m.start());
  let phone_at = PHONE_NUMBER.find(detail).map(|m| m.start());

  let Some(mut cut) = [keyword_at, phone_at].into_iter().flatten().min() else {
    return (detail.trim().to_owned(), None);
  };

  // Keep an opening bracket that wraps the memo on the memo side.
  if let Some(open) = detail[..cut].rfind(['(', '['])
    && !detail[open..cut].contains([')', ']'])
  {
    cut = open;
  }

  let body = detail[..cut].trim().to_owned();
  let memo = detail[cut..]
    .trim()
    .trim_start_matches(['(', '['])
    .trim_end_matches([')', ']'])
    .trim()
    .to_owned();

  (body, (!memo.is_empty()).then_some(memo))
}
