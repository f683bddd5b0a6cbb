//! Building classification.
//!
//! The class of a building decides how strictly a detail address must name a
//! unit: apartments need a 동/호 pair, villa-like buildings need some unit
//! label, everything else is accepted as-is.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Building classification code the geocoder reports for 공동주택.
pub const APARTMENT_CLASS_CODE: &str = "1";

/// Name keywords that make a building a strict apartment.
const STRICT_KEYWORDS: &[&str] = &["아파트", "APT", "공동주택", "연립", "다세대"];

/// Name keywords for villa/officetel-like buildings.
const RELAXED_KEYWORDS: &[&str] = &[
  "빌라",
  "오피스텔",
  "타운하우스",
  "타워",
  "맨션",
  "팰리스",
  "빌딩",
  "레지던스",
  "하이츠",
  "주상복합",
];

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
pub enum BuildingType {
  /// Strict: a 동/호 (or letter-unit) designator is required.
  Apartment,
  /// Relaxed: villas, officetels and the like; any unit label will do.
  QuasiApartment,
  /// No unit expected.
  General,
}

impl BuildingType {
  pub const ALL: [BuildingType; 3] =
    [Self::Apartment, Self::QuasiApartment, Self::General];

  /// The stable string stored in the database and sent over the wire.
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    BuildingType::from_str(s).map_err(|_| Error::UnknownBuildingType(s.to_owned()))
  }
}

/// Classify a building from the geocoder's class code and the building name.
///
/// Every input maps to exactly one class; missing data falls through to
/// [`BuildingType::General`].
pub fn classify(class_code: Option<&str>, name: Option<&str>) -> BuildingType {
  let name = name.map(str::trim).unwrap_or_default();
  let upper = name.to_uppercase();

  let strict_code = class_code.is_some_and(|c| c.trim() == APARTMENT_CLASS_CODE);
  if strict_code || STRICT_KEYWORDS.iter().any(|k| upper.contains(k)) {
    return BuildingType::Apartment;
  }

  if RELAXED_KEYWORDS.iter().any(|k| upper.contains(k)) || name.ends_with('빌') {
    return BuildingType::QuasiApartment;
  }

  BuildingType::General
}
