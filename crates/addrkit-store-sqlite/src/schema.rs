//! SQL schema for the addrkit SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per distinct (original_detail, building_type). Rows are updated in
-- place on every repeat sighting and never deleted by the pipeline.
CREATE TABLE IF NOT EXISTS learning_records (
    record_id            TEXT PRIMARY KEY,
    original_detail      TEXT NOT NULL,
    corrected_detail     TEXT NOT NULL,
    building_type        TEXT NOT NULL,   -- 'apartment' | 'quasi_apartment' | 'general'
    correction_type      TEXT NOT NULL,
    confidence           REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    occurrence_count     INTEGER NOT NULL DEFAULT 1,
    success_count        INTEGER NOT NULL DEFAULT 0,
    pattern_regex        TEXT,
    corrected_template   TEXT,
    error_pattern        TEXT,
    problem_description  TEXT,
    solution_description TEXT,
    similar_patterns     TEXT NOT NULL DEFAULT '[]',   -- JSON array
    extracted_memo       TEXT,
    user_confirmed       INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at           TEXT NOT NULL,
    last_used_at         TEXT NOT NULL,
    analyzed_at          TEXT,
    UNIQUE (original_detail, building_type)
);

CREATE INDEX IF NOT EXISTS learning_records_frequency_idx
    ON learning_records(building_type, occurrence_count DESC);
CREATE INDEX IF NOT EXISTS learning_records_pattern_idx
    ON learning_records(building_type) WHERE pattern_regex IS NOT NULL;

PRAGMA user_version = 1;
";
