//! [`SqliteStore`], the SQLite implementation of [`PatternRepository`].

use std::path::Path;

use addrkit_core::{
  building::BuildingType,
  learning::{LearningRecord, NewCorrection, Reinforcement, SUCCESS_BOOST},
  store::{LearningStats, PatternRepository, RecordQuery},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawRecord, decode_uuid, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// Write one record. On a key conflict the existing `record_id`,
/// `created_at`, `success_count` and `last_used_at` are kept, and
/// `occurrence_count` never moves backwards even if another writer
/// reinforced the row between our read and this write.
const UPSERT: &str = "
INSERT INTO learning_records (
    record_id, original_detail, corrected_detail, building_type, correction_type,
    confidence, occurrence_count, success_count, pattern_regex, corrected_template,
    error_pattern, problem_description, solution_description, similar_patterns,
    extracted_memo, user_confirmed, created_at, updated_at, last_used_at, analyzed_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
ON CONFLICT (original_detail, building_type) DO UPDATE SET
    corrected_detail     = excluded.corrected_detail,
    correction_type      = excluded.correction_type,
    confidence           = excluded.confidence,
    occurrence_count     = MAX(learning_records.occurrence_count + 1, excluded.occurrence_count),
    pattern_regex        = excluded.pattern_regex,
    corrected_template   = excluded.corrected_template,
    error_pattern        = excluded.error_pattern,
    problem_description  = excluded.problem_description,
    solution_description = excluded.solution_description,
    similar_patterns     = excluded.similar_patterns,
    extracted_memo       = excluded.extracted_memo,
    user_confirmed       = excluded.user_confirmed,
    updated_at           = excluded.updated_at,
    analyzed_at          = excluded.analyzed_at
RETURNING record_id, occurrence_count";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A learning store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch the record for a natural key if its confidence is high enough.
  async fn select_by_key(
    &self,
    original: &str,
    building_type: BuildingType,
    min_confidence: f64,
  ) -> Result<Option<LearningRecord>> {
    let original = original.trim().to_owned();
    let bt = building_type.as_str();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM learning_records
           WHERE original_detail = ?1 AND building_type = ?2 AND confidence >= ?3"
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![original, bt, min_confidence], RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  /// Records of one building class, most frequent first.
  async fn select_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    min_occurrences: u32,
    patterned_only: bool,
    limit: usize,
  ) -> Result<Vec<LearningRecord>> {
    let bt = building_type.as_str();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let pattern_clause = if patterned_only { "AND pattern_regex IS NOT NULL" } else { "" };
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM learning_records
           WHERE building_type = ?1 AND confidence >= ?2 AND occurrence_count >= ?3
           {pattern_clause}
           ORDER BY occurrence_count DESC, created_at ASC
           LIMIT ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![bt, min_confidence, min_occurrences, limit_val],
            RawRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── PatternRepository impl ──────────────────────────────────────────────────

impl PatternRepository for SqliteStore {
  type Error = crate::Error;

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn find_exact(
    &self,
    original: &str,
    building_type: BuildingType,
    min_confidence: f64,
  ) -> Result<Option<LearningRecord>> {
    self.select_by_key(original, building_type, min_confidence).await
  }

  async fn find_regex_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    limit: usize,
  ) -> Result<Vec<LearningRecord>> {
    self.select_candidates(building_type, min_confidence, 0, true, limit).await
  }

  async fn find_fuzzy_candidates(
    &self,
    building_type: BuildingType,
    min_confidence: f64,
    min_occurrences: u32,
    limit: usize,
  ) -> Result<Vec<LearningRecord>> {
    self
      .select_candidates(building_type, min_confidence, min_occurrences, false, limit)
      .await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_correction(
    &self,
    input: NewCorrection,
  ) -> Result<(LearningRecord, Reinforcement)> {
    let now = Utc::now();
    let existing = self
      .select_by_key(&input.original_detail, input.building_type(), 0.0)
      .await?;

    let (mut record, outcome) = match existing {
      Some(mut r) => {
        let outcome = r.reinforce(input, now);
        (r, outcome)
      }
      None => (LearningRecord::first_sighting(input, now), Reinforcement::Inserted),
    };

    let raw = RawRecord::from_record(&record)?;
    let (id_str, occurrences): (String, u32) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          UPSERT,
          rusqlite::params![
            raw.record_id,
            raw.original_detail,
            raw.corrected_detail,
            raw.building_type,
            raw.correction_type,
            raw.confidence,
            raw.occurrence_count,
            raw.success_count,
            raw.pattern_regex,
            raw.corrected_template,
            raw.error_pattern,
            raw.problem_description,
            raw.solution_description,
            raw.similar_patterns,
            raw.extracted_memo,
            raw.user_confirmed,
            raw.created_at,
            raw.updated_at,
            raw.last_used_at,
            raw.analyzed_at,
          ],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;

    record.record_id = decode_uuid(&id_str)?;
    record.occurrence_count = occurrences;
    Ok((record, outcome))
  }

  async fn touch_last_used(&self, record_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(record_id);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE learning_records SET last_used_at = ?2 WHERE record_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn increment_success_count(
    &self,
    original: &str,
    building_type: BuildingType,
  ) -> Result<Option<LearningRecord>> {
    let original = original.trim().to_owned();
    let bt = building_type.as_str();
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "UPDATE learning_records
           SET confidence    = MIN(1.0, confidence + ?3),
               success_count = success_count + 1,
               updated_at    = ?4
           WHERE original_detail = ?1 AND building_type = ?2
           RETURNING {RECORD_COLUMNS}"
        );
        Ok(
          conn
            .query_row(
              &sql,
              rusqlite::params![original, bt, SUCCESS_BOOST, at_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  // ── Admin reads ───────────────────────────────────────────────────────────

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<LearningRecord>> {
    let bt = query.building_type.map(BuildingType::as_str);
    let limit_val = query.limit.unwrap_or(100) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {RECORD_COLUMNS} FROM learning_records
           WHERE (?1 IS NULL OR building_type = ?1)
           ORDER BY occurrence_count DESC, created_at ASC
           LIMIT ?2 OFFSET ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![bt, limit_val, offset_val], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn stats(&self) -> Result<LearningStats> {
    let stats = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             COUNT(*),
             COALESCE(SUM(building_type = 'apartment'), 0),
             COALESCE(SUM(building_type = 'quasi_apartment'), 0),
             COALESCE(SUM(building_type = 'general'), 0),
             COALESCE(SUM(pattern_regex IS NOT NULL), 0),
             COALESCE(SUM(user_confirmed), 0),
             COALESCE(SUM(occurrence_count), 0),
             COALESCE(AVG(confidence), 0.0)
           FROM learning_records",
          [],
          |row| {
            Ok(LearningStats {
              total_records:           row.get(0)?,
              apartment_records:       row.get(1)?,
              quasi_apartment_records: row.get(2)?,
              general_records:         row.get(3)?,
              pattern_records:         row.get(4)?,
              user_confirmed_records:  row.get(5)?,
              total_occurrences:       row.get(6)?,
              average_confidence:      row.get(7)?,
            })
          },
        )?)
      })
      .await?;
    Ok(stats)
  }
}
