//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD` (so they
//! sort lexically), UUIDs are hyphenated lowercase strings and enums use their
//! snake_case names.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use incumbent_core::{
  jurisdiction::JurisdictionScope,
  reference::{ElectionEvent, GovernmentPosition, Politician},
  tenure::PositionHistory,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownEnum { column, value: s.to_owned() })
}

// ─── Tenure rows ─────────────────────────────────────────────────────────────

/// Column list shared by every `position_history` SELECT; matches the field
/// order read by [`RawTenure::from_row`].
pub const TENURE_COLUMNS: &str = "
  id, politician_id, position_id, party_id,
  is_national, region_id, province_id, city_id, barangay_id, district_id,
  term_start, term_end, is_current, ended_reason, election_id,
  created_by, created_at, updated_at";

/// Raw values read directly from a `position_history` row.
pub struct RawTenure {
  pub id:            String,
  pub politician_id: String,
  pub position_id:   String,
  pub party_id:      Option<String>,
  pub is_national:   bool,
  pub region_id:     Option<String>,
  pub province_id:   Option<String>,
  pub city_id:       Option<String>,
  pub barangay_id:   Option<String>,
  pub district_id:   Option<String>,
  pub term_start:    String,
  pub term_end:      Option<String>,
  pub is_current:    bool,
  pub ended_reason:  Option<String>,
  pub election_id:   Option<String>,
  pub created_by:    Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawTenure {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      politician_id: row.get(1)?,
      position_id:   row.get(2)?,
      party_id:      row.get(3)?,
      is_national:   row.get(4)?,
      region_id:     row.get(5)?,
      province_id:   row.get(6)?,
      city_id:       row.get(7)?,
      barangay_id:   row.get(8)?,
      district_id:   row.get(9)?,
      term_start:    row.get(10)?,
      term_end:      row.get(11)?,
      is_current:    row.get(12)?,
      ended_reason:  row.get(13)?,
      election_id:   row.get(14)?,
      created_by:    row.get(15)?,
      created_at:    row.get(16)?,
      updated_at:    row.get(17)?,
    })
  }

  pub fn into_tenure(self) -> Result<PositionHistory> {
    // Area columns resolve in the same priority order as a request scope.
    let jurisdiction = JurisdictionScope {
      is_national: self.is_national,
      region_id:   decode_opt_uuid(self.region_id)?,
      province_id: decode_opt_uuid(self.province_id)?,
      city_id:     decode_opt_uuid(self.city_id)?,
      barangay_id: decode_opt_uuid(self.barangay_id)?,
      district_id: decode_opt_uuid(self.district_id)?,
    }
    .resolve()?;

    Ok(PositionHistory {
      id: decode_uuid(&self.id)?,
      politician_id: decode_uuid(&self.politician_id)?,
      position_id: decode_uuid(&self.position_id)?,
      party_id: decode_opt_uuid(self.party_id)?,
      jurisdiction,
      term_start: decode_date(&self.term_start)?,
      term_end: self.term_end.as_deref().map(decode_date).transpose()?,
      is_current: self.is_current,
      ended_reason: self
        .ended_reason
        .as_deref()
        .map(|s| decode_enum("ended_reason", s))
        .transpose()?,
      election_id: decode_opt_uuid(self.election_id)?,
      created_by: decode_opt_uuid(self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Reference rows ──────────────────────────────────────────────────────────

pub struct RawPolitician {
  pub politician_id: String,
  pub name:          String,
  pub created_at:    String,
}

impl RawPolitician {
  pub fn into_politician(self) -> Result<Politician> {
    Ok(Politician {
      politician_id: decode_uuid(&self.politician_id)?,
      name:          self.name,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawPosition {
  pub position_id: String,
  pub name:        String,
  pub level:       String,
  pub branch:      String,
  pub is_elected:  bool,
  pub max_terms:   Option<u32>,
  pub term_years:  Option<u32>,
  pub created_at:  String,
}

impl RawPosition {
  pub fn into_position(self) -> Result<GovernmentPosition> {
    Ok(GovernmentPosition {
      position_id: decode_uuid(&self.position_id)?,
      name:        self.name,
      level:       decode_enum("level", &self.level)?,
      branch:      decode_enum("branch", &self.branch)?,
      is_elected:  self.is_elected,
      max_terms:   self.max_terms,
      term_years:  self.term_years,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const ELECTION_COLUMNS: &str =
  "election_id, name, election_date, status, created_at, updated_at";

pub struct RawElection {
  pub election_id:   String,
  pub name:          String,
  pub election_date: String,
  pub status:        String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawElection {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      election_id:   row.get(0)?,
      name:          row.get(1)?,
      election_date: row.get(2)?,
      status:        row.get(3)?,
      created_at:    row.get(4)?,
      updated_at:    row.get(5)?,
    })
  }

  pub fn into_election(self) -> Result<ElectionEvent> {
    Ok(ElectionEvent {
      election_id:   decode_uuid(&self.election_id)?,
      name:          self.name,
      election_date: decode_date(&self.election_date)?,
      status:        decode_enum("status", &self.status)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
