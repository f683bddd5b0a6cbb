//! Row status and the reason-code taxonomy.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// The three-valued verdict every row ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Valid,
  Warning,
  Invalid,
}

/// Why a row ended in its [`Status`].
///
/// `E_*` codes before the detail stage are fatal to the row; detail-level
/// codes leave a best-effort address on the row.
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
pub enum ReasonCode {
  #[serde(rename = "OK_STD")]
  #[strum(serialize = "OK_STD")]
  Ok,

  // ── Fatal ─────────────────────────────────────────────────────────────
  #[serde(rename = "E_EMPTY")]
  #[strum(serialize = "E_EMPTY")]
  Empty,
  #[serde(rename = "E_TOO_SHORT")]
  #[strum(serialize = "E_TOO_SHORT")]
  TooShort,
  #[serde(rename = "E_API_ERROR")]
  #[strum(serialize = "E_API_ERROR")]
  ApiError,
  #[serde(rename = "E_BASE_NOT_FOUND")]
  #[strum(serialize = "E_BASE_NOT_FOUND")]
  BaseNotFound,
  #[serde(rename = "E_INTERNAL")]
  #[strum(serialize = "E_INTERNAL")]
  Internal,

  // ── Detail content ────────────────────────────────────────────────────
  #[serde(rename = "E_DETAIL_INVALID_CHARS")]
  #[strum(serialize = "E_DETAIL_INVALID_CHARS")]
  DetailInvalidChars,
  #[serde(rename = "E_DETAIL_FORBIDDEN")]
  #[strum(serialize = "E_DETAIL_FORBIDDEN")]
  DetailForbidden,
  #[serde(rename = "W_DETAIL_MIXED_MEMO")]
  #[strum(serialize = "W_DETAIL_MIXED_MEMO")]
  DetailMixedMemo,
  #[serde(rename = "W_DETAIL_SUSPECT_UNIT")]
  #[strum(serialize = "W_DETAIL_SUSPECT_UNIT")]
  DetailSuspectUnit,

  // ── Detail structure ──────────────────────────────────────────────────
  #[serde(rename = "W_DETAIL_MISSING_UNIT")]
  #[strum(serialize = "W_DETAIL_MISSING_UNIT")]
  DetailMissingUnit,
  #[serde(rename = "W_DETAIL_MISSING_HO")]
  #[strum(serialize = "W_DETAIL_MISSING_HO")]
  DetailMissingHo,

  // ── Base address ──────────────────────────────────────────────────────
  #[serde(rename = "W_BASE_AMBIGUOUS")]
  #[strum(serialize = "W_BASE_AMBIGUOUS")]
  BaseAmbiguous,
}

impl ReasonCode {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    ReasonCode::from_str(s).map_err(|_| Error::UnknownReasonCode(s.to_owned()))
  }

  /// The row status this code implies.
  pub fn status(self) -> Status {
    match self {
      Self::Ok => Status::Valid,
      Self::Empty
      | Self::TooShort
      | Self::ApiError
      | Self::BaseNotFound
      | Self::Internal => Status::Invalid,
      Self::DetailInvalidChars
      | Self::DetailForbidden
      | Self::DetailMixedMemo
      | Self::DetailSuspectUnit
      | Self::DetailMissingUnit
      | Self::DetailMissingHo
      | Self::BaseAmbiguous => Status::Warning,
    }
  }

  /// Confidence the rule engine assigns to a verdict carrying this code.
  pub fn rule_confidence(self) -> f64 {
    match self {
      Self::Ok => 0.95,
      Self::DetailMissingHo => 0.70,
      Self::DetailMissingUnit | Self::DetailSuspectUnit => 0.60,
      Self::DetailMixedMemo | Self::BaseAmbiguous => 0.50,
      _ => 0.75,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_names() {
    assert_eq!(ReasonCode::Ok.as_str(), "OK_STD");
    assert_eq!(ReasonCode::DetailMissingHo.to_string(), "W_DETAIL_MISSING_HO");
    assert_eq!(
      serde_json::to_string(&ReasonCode::DetailMixedMemo).unwrap(),
      "\"W_DETAIL_MIXED_MEMO\""
    );
    assert_eq!(ReasonCode::parse("E_API_ERROR").unwrap(), ReasonCode::ApiError);
    assert!(ReasonCode::parse("W_NOPE").is_err());
  }

  #[test]
  fn status_follows_prefix() {
    assert_eq!(ReasonCode::BaseNotFound.status(), Status::Invalid);
    assert_eq!(ReasonCode::DetailForbidden.status(), Status::Warning);
    assert_eq!(ReasonCode::BaseAmbiguous.status(), Status::Warning);
    assert_eq!(ReasonCode::Ok.status(), Status::Valid);
  }

  #[test]
  fn confidence_table() {
    assert_eq!(ReasonCode::Ok.rule_confidence(), 0.95);
    assert_eq!(ReasonCode::DetailMissingHo.rule_confidence(), 0.70);
    assert_eq!(ReasonCode::DetailMissingUnit.rule_confidence(), 0.60);
    assert_eq!(ReasonCode::DetailSuspectUnit.rule_confidence(), 0.60);
    assert_eq!(ReasonCode::DetailMixedMemo.rule_confidence(), 0.50);
    assert_eq!(ReasonCode::BaseAmbiguous.rule_confidence(), 0.50);
    assert_eq!(ReasonCode::DetailForbidden.rule_confidence(), 0.75);
  }
}
