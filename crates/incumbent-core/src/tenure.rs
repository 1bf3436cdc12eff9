//! Tenures: one continuous term of one politician in one seat.
//!
//! A seat is a (position, jurisdiction) pair. At most one tenure per seat is
//! current. Closing a tenure is the only temporal mutation: history is
//! otherwise append-only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, jurisdiction::Jurisdiction};

// ─── Ended reason ────────────────────────────────────────────────────────────

/// Why a tenure stopped being current.
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
pub enum EndedReason {
  /// The same politician started a new term, or the term simply ran out.
  TermChange,
  /// A different politician took the seat.
  Replaced,
  /// Closed in bulk ahead of an election's results being imported.
  Election,
}

// ─── Tenure ──────────────────────────────────────────────────────────────────

/// One row of position history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHistory {
  pub id:            Uuid,
  pub politician_id: Uuid,
  pub position_id:   Uuid,
  /// Party affiliation during this tenure.
  pub party_id:      Option<Uuid>,
  pub jurisdiction:  Jurisdiction,
  pub term_start:    NaiveDate,
  /// `None` while ongoing. May be set on a current tenure as a scheduled end.
  pub term_end:      Option<NaiveDate>,
  pub is_current:    bool,
  /// `None` while current.
  pub ended_reason:  Option<EndedReason>,
  /// The election that produced or ended this tenure.
  pub election_id:   Option<Uuid>,
  pub created_by:    Option<Uuid>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

// ─── NewTenure ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::TenureStore::create`]. The store assigns the id
/// and timestamps; the new tenure is always current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTenure {
  pub politician_id: Uuid,
  pub position_id:   Uuid,
  pub party_id:      Option<Uuid>,
  pub jurisdiction:  Jurisdiction,
  pub term_start:    NaiveDate,
  pub term_end:      Option<NaiveDate>,
  pub election_id:   Option<Uuid>,
  pub created_by:    Option<Uuid>,
}

impl NewTenure {
  pub fn new(
    politician_id: Uuid,
    position_id: Uuid,
    jurisdiction: Jurisdiction,
    term_start: NaiveDate,
  ) -> Self {
    Self {
      politician_id,
      position_id,
      party_id: None,
      jurisdiction,
      term_start,
      term_end: None,
      election_id: None,
      created_by: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    Error::check_term(self.term_start, self.term_end)
  }
}

// ─── TenurePatch ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::TenureStore::update`]. `None` leaves a field
/// untouched; the nested `Option` on nullable columns allows clearing them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenurePatch {
  pub party_id:    Option<Option<Uuid>>,
  pub term_start:  Option<NaiveDate>,
  pub term_end:    Option<Option<NaiveDate>>,
  pub election_id: Option<Option<Uuid>>,
  /// `Some(false)` closes the tenure with reason `term_change`; it requires
  /// `term_end` in the same patch.
  pub is_current:  Option<bool>,
}

impl TenurePatch {
  pub fn is_empty(&self) -> bool { self == &Self::default() }

  /// Apply the patch to a copy of `tenure` and check the result.
  ///
  /// Only current tenures can be patched. The caller persists the returned
  /// value and stamps `updated_at`.
  pub fn apply_to(&self, tenure: &PositionHistory) -> Result<PositionHistory> {
    if !tenure.is_current {
      return Err(Error::TenureClosed(tenure.id));
    }

    let mut next = tenure.clone();
    if let Some(party_id) = self.party_id {
      next.party_id = party_id;
    }
    if let Some(term_start) = self.term_start {
      next.term_start = term_start;
    }
    if let Some(term_end) = self.term_end {
      next.term_end = term_end;
    }
    if let Some(election_id) = self.election_id {
      next.election_id = election_id;
    }
    if self.is_current == Some(false) {
      if next.term_end.is_none() {
        return Err(Error::MissingTermEnd);
      }
      next.is_current = false;
      next.ended_reason = Some(EndedReason::TermChange);
    }

    Error::check_term(next.term_start, next.term_end)?;
    Ok(next)
  }
}
