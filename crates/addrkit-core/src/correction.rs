//! Classifying a correction and generalizing it into a reusable pattern.

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result, validate::contains_memo_keyword};

/// Categorical label describing what a correction changed.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrectionType {
  NoChange,
  MemoSeparation,
  HyphenToUnit,
  SpaceToUnit,
  MissingDong,
  MissingHo,
  FloorSpaceFix,
  GeneralNormalization,
}

impl CorrectionType {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    CorrectionType::from_str(s).map_err(|_| Error::UnknownCorrectionType(s.to_owned()))
  }
}

static BARE_HYPHEN_PAIR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*\d+\s*-\s*\d+\s*$").unwrap());

static BARE_SPACE_PAIR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*\d+\s+\d+\s*$").unwrap());

static DONG_HO: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\d+\s*동.*\d+\s*호").unwrap());

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Infer the correction type from the difference between two detail strings.
pub fn infer_correction_type(original: &str, corrected: &str) -> CorrectionType {
  let (original, corrected) = (original.trim(), corrected.trim());

  if original == corrected {
    return CorrectionType::NoChange;
  }
  if contains_memo_keyword(original) && !contains_memo_keyword(corrected) {
    return CorrectionType::MemoSeparation;
  }
  if DONG_HO.is_match(corrected) {
    if BARE_HYPHEN_PAIR.is_match(original) {
      return CorrectionType::HyphenToUnit;
    }
    if BARE_SPACE_PAIR.is_match(original) {
      return CorrectionType::SpaceToUnit;
    }
  }
  if corrected.contains('동') && !original.contains('동') {
    return CorrectionType::MissingDong;
  }
  if corrected.contains('호') && !original.contains('호') {
    return CorrectionType::MissingHo;
  }
  if original.contains("지하") && corrected.contains("지하") && strip_ws(original) == strip_ws(corrected) {
    return CorrectionType::FloorSpaceFix;
  }
  CorrectionType::GeneralNormalization
}

fn strip_ws(s: &str) -> String { s.chars().filter(|c| !c.is_whitespace()).collect() }

// ─── Generalization ──────────────────────────────────────────────────────────

/// A correction lifted from one concrete string to every string of its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralizedPattern {
  /// Anchored regex with one capture group per digit run of the original.
  pub regex:         String,
  /// The corrected string with `${n}` in place of captured digit runs.
  pub template:      String,
  /// Human-readable shape of the original, digit runs shown as `N`.
  pub error_pattern: String,
}

/// Generalize `original → corrected` by abstracting over digit runs.
///
/// Returns `None` when there is nothing to abstract (no digits, no change) or
/// when the corrected string introduces a number the original never had.
pub fn generalize(original: &str, corrected: &str) -> Option<GeneralizedPattern> {
  let (original, corrected) = (original.trim(), corrected.trim());
  if original == corrected {
    return None;
  }

  let runs: Vec<&str> = DIGITS.find_iter(original).map(|m| m.as_str()).collect();
  if runs.is_empty() {
    return None;
  }

  let mut regex = String::from("^");
  let mut error_pattern = String::new();
  let mut last = 0;
  for m in DIGITS.find_iter(original) {
    push_literal(&mut regex, &original[last..m.start()]);
    error_pattern.push_str(&original[last..m.start()]);
    regex.push_str(r"(\d+)");
    error_pattern.push('N');
    last = m.end();
  }
  push_literal(&mut regex, &original[last..]);
  error_pattern.push_str(&original[last..]);
  regex.push('$');

  let corrected_runs: Vec<&str> = DIGITS.find_iter(corrected).map(|m| m.as_str()).collect();
  let count = |list: &[&str], value: &str| list.iter().filter(|r| **r == value).count();

  let mut template = String::new();
  let mut last = 0;
  for (i, m) in DIGITS.find_iter(corrected).enumerate() {
    let value = m.as_str();
    // A value repeated in the original pairs up by order of appearance,
    // which only holds when both sides repeat it equally often.
    let in_original = count(&runs, value);
    if in_original > 1 && count(&corrected_runs, value) != in_original {
      return None;
    }
    let nth = count(&corrected_runs[..i], value);
    let group = runs
      .iter()
      .enumerate()
      .filter(|(_, r)| **r == value)
      .nth(nth)
      .map(|(g, _)| g + 1)?;
    template.push_str(&escape_template(&corrected[last..m.start()]));
    template.push_str(&format!("${{{group}}}"));
    last = m.end();
  }
  template.push_str(&escape_template(&corrected[last..]));

  Some(GeneralizedPattern { regex, template, error_pattern })
}

/// Append a literal fragment, letting any whitespace run match loosely.
fn push_literal(out: &mut String, literal: &str) {
  let mut first = true;
  for part in literal.split(char::is_whitespace) {
    if !first {
      out.push_str(r"\s*");
    }
    out.push_str(&regex::escape(part));
    first = false;
  }
}

fn escape_template(literal: &str) -> String { literal.replace('$', "$$") }
