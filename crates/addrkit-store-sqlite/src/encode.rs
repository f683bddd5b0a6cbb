//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! `similar_patterns` a compact JSON array. Enums use their snake_case labels.

use addrkit_core::{
  building::BuildingType,
  correction::CorrectionType,
  learning::LearningRecord,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Similar patterns ────────────────────────────────────────────────────────

pub fn encode_patterns(patterns: &[String]) -> Result<String> {
  Ok(serde_json::to_string(patterns)?)
}

pub fn decode_patterns(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that builds a [`RawRecord`].
pub const RECORD_COLUMNS: &str = "record_id, original_detail, corrected_detail, building_type,
  correction_type, confidence, occurrence_count, success_count, pattern_regex,
  corrected_template, error_pattern, problem_description, solution_description,
  similar_patterns, extracted_memo, user_confirmed, created_at, updated_at,
  last_used_at, analyzed_at";

/// Raw values read directly from a `learning_records` row.
pub struct RawRecord {
  pub record_id:            String,
  pub original_detail:      String,
  pub corrected_detail:     String,
  pub building_type:        String,
  pub correction_type:      String,
  pub confidence:           f64,
  pub occurrence_count:     u32,
  pub success_count:        u32,
  pub pattern_regex:        Option<String>,
  pub corrected_template:   Option<String>,
  pub error_pattern:        Option<String>,
  pub problem_description:  Option<String>,
  pub solution_description: Option<String>,
  pub similar_patterns:     String,
  pub extracted_memo:       Option<String>,
  pub user_confirmed:       bool,
  pub created_at:           String,
  pub updated_at:           String,
  pub last_used_at:         String,
  pub analyzed_at:          Option<String>,
}

impl RawRecord {
  /// Read a row selected with [`RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:            row.get(0)?,
      original_detail:      row.get(1)?,
      corrected_detail:     row.get(2)?,
      building_type:        row.get(3)?,
      correction_type:      row.get(4)?,
      confidence:           row.get(5)?,
      occurrence_count:     row.get(6)?,
      success_count:        row.get(7)?,
      pattern_regex:        row.get(8)?,
      corrected_template:   row.get(9)?,
      error_pattern:        row.get(10)?,
      problem_description:  row.get(11)?,
      solution_description: row.get(12)?,
      similar_patterns:     row.get(13)?,
      extracted_memo:       row.get(14)?,
      user_confirmed:       row.get(15)?,
      created_at:           row.get(16)?,
      updated_at:           row.get(17)?,
      last_used_at:         row.get(18)?,
      analyzed_at:          row.get(19)?,
    })
  }

  pub fn into_record(self) -> Result<LearningRecord> {
    Ok(LearningRecord {
      record_id:            decode_uuid(&self.record_id)?,
      original_detail:      self.original_detail,
      corrected_detail:     self.corrected_detail,
      building_type:        BuildingType::parse(&self.building_type)?,
      correction_type:      CorrectionType::parse(&self.correction_type)?,
      confidence:           self.confidence,
      occurrence_count:     self.occurrence_count,
      success_count:        self.success_count,
      pattern_regex:        self.pattern_regex,
      corrected_template:   self.corrected_template,
      error_pattern:        self.error_pattern,
      problem_description:  self.problem_description,
      solution_description: self.solution_description,
      similar_patterns:     decode_patterns(&self.similar_patterns)?,
      extracted_memo:       self.extracted_memo,
      user_confirmed:       self.user_confirmed,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
      last_used_at:         decode_dt(&self.last_used_at)?,
      analyzed_at:          self.analyzed_at.as_deref().map(decode_dt).transpose()?,
    })
  }

  /// Encode a domain record for writing.
  pub fn from_record(r: &LearningRecord) -> Result<Self> {
    Ok(Self {
      record_id:            encode_uuid(r.record_id),
      original_detail:      r.original_detail.clone(),
      corrected_detail:     r.corrected_detail.clone(),
      building_type:        r.building_type.as_str().to_owned(),
      correction_type:      r.correction_type.as_str().to_owned(),
      confidence:           r.confidence,
      occurrence_count:     r.occurrence_count,
      success_count:        r.success_count,
      pattern_regex:        r.pattern_regex.clone(),
      corrected_template:   r.corrected_template.clone(),
      error_pattern:        r.error_pattern.clone(),
      problem_description:  r.problem_description.clone(),
      solution_description: r.solution_description.clone(),
      similar_patterns:     encode_patterns(&r.similar_patterns)?,
      extracted_memo:       r.extracted_memo.clone(),
      user_confirmed:       r.user_confirmed,
      created_at:           encode_dt(r.created_at),
      updated_at:           encode_dt(r.updated_at),
      last_used_at:         encode_dt(r.last_used_at),
      analyzed_at:          r.analyzed_at.map(encode_dt),
    })
  }
}
