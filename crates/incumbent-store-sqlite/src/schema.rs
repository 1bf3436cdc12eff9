//! SQL schema for the Incumbent SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS politicians (
    politician_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parties (
    party_id      TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    abbreviation  TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS government_positions (
    position_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    level         TEXT NOT NULL,   -- PositionLevel, snake_case
    branch        TEXT NOT NULL,   -- Branch, snake_case
    is_elected    INTEGER NOT NULL DEFAULT 1,
    max_terms     INTEGER,
    term_years    INTEGER,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS elections (
    election_id   TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    election_date TEXT NOT NULL,   -- YYYY-MM-DD
    status        TEXT NOT NULL DEFAULT 'upcoming',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- One row per tenure. Rows are only ever closed (is_current 1 -> 0), corrected
-- while current, or hard-deleted by an administrator.
CREATE TABLE IF NOT EXISTS position_history (
    id               TEXT PRIMARY KEY,
    politician_id    TEXT NOT NULL REFERENCES politicians(politician_id),
    position_id      TEXT NOT NULL REFERENCES government_positions(position_id),
    party_id         TEXT REFERENCES parties(party_id),
    is_national      INTEGER NOT NULL DEFAULT 0,
    region_id        TEXT,
    province_id      TEXT,
    city_id          TEXT,
    barangay_id      TEXT,
    district_id      TEXT,
    -- Canonical resolved jurisdiction ('national', 'city:<uuid>', ...).
    -- NULLs compare distinct in UNIQUE indexes, so the seat index keys on
    -- this column rather than on the six nullable ones.
    jurisdiction_key TEXT NOT NULL,
    term_start       TEXT NOT NULL,   -- YYYY-MM-DD
    term_end         TEXT,
    is_current       INTEGER NOT NULL DEFAULT 1,
    ended_reason     TEXT,            -- 'term_change' | 'replaced' | 'election'
    election_id      TEXT REFERENCES elections(election_id),
    created_by       TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    CHECK (is_current IN (0, 1)),
    CHECK (is_current = 1 OR (term_end IS NOT NULL AND ended_reason IS NOT NULL)),
    CHECK (is_current = 0 OR ended_reason IS NULL)
);

-- At most one current holder per seat.
CREATE UNIQUE INDEX IF NOT EXISTS position_history_current_seat_idx
    ON position_history(position_id, jurisdiction_key)
    WHERE is_current = 1;

CREATE INDEX IF NOT EXISTS position_history_politician_idx
    ON position_history(politician_id, term_start);
CREATE INDEX IF NOT EXISTS position_history_position_idx
    ON position_history(position_id, is_current);

PRAGMA user_version = 1;
";
