//! Reference entities: politicians, parties, government positions and
//! election events.
//!
//! The registry reads these but does not own them. The only mutation it
//! performs is moving an election to [`ElectionStatus::InProgress`] when its
//! seats are archived.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Politician ──────────────────────────────────────────────────────────────

/// A person who can hold a position. Identity resolution happens elsewhere;
/// this is only the anchor for foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Politician {
  pub politician_id: Uuid,
  pub name:          String,
  pub created_at:    DateTime<Utc>,
}

// ─── Party ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
  pub party_id:     Uuid,
  pub name:         String,
  pub abbreviation: Option<String>,
  pub created_at:   DateTime<Utc>,
}

// ─── Government position ─────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PositionLevel {
  National,
  Regional,
  Provincial,
  City,
  Municipal,
  Barangay,
  District,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Branch {
  Executive,
  Legislative,
  Judicial,
}

/// An office such as "Senator" or "City Councilor".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernmentPosition {
  pub position_id: Uuid,
  pub name:        String,
  pub level:       PositionLevel,
  pub branch:      Branch,
  /// `false` for appointed offices.
  pub is_elected:  bool,
  /// Maximum consecutive terms, if limited.
  pub max_terms:   Option<u32>,
  pub term_years:  Option<u32>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::TenureStore::add_position`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPosition {
  pub name:       String,
  pub level:      PositionLevel,
  pub branch:     Branch,
  pub is_elected: bool,
  pub max_terms:  Option<u32>,
  pub term_years: Option<u32>,
}

impl NewPosition {
  /// An elected office with no term limits recorded.
  pub fn elected(
    name: impl Into<String>,
    level: PositionLevel,
    branch: Branch,
  ) -> Self {
    Self {
      name: name.into(),
      level,
      branch,
      is_elected: true,
      max_terms: None,
      term_years: None,
    }
  }
}

// ─── Election event ──────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ElectionStatus {
  #[default]
  Upcoming,
  InProgress,
  Completed,
  Cancelled,
}

impl ElectionStatus {
  /// Whether results can still be imported (and seats archived) for it.
  pub fn is_open(&self) -> bool {
    matches!(self, Self::Upcoming | Self::InProgress)
  }
}

/// A real-world election. Tags the tenures it produced or ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionEvent {
  pub election_id:   Uuid,
  pub name:          String,
  pub election_date: NaiveDate,
  pub status:        ElectionStatus,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}
