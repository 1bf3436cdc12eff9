//! The assignment decision engine.
//!
//! Given the seat's current holder (if any) and an incoming
//! [`AssignmentRequest`], [`decide`] picks one of four transitions and
//! [`plan`] turns it into the concrete writes a store must perform. Both are
//! pure: stores call them inside their own transaction, after reading the
//! current holder under a write lock.
//!
//! | seat        | requester | mode         | transition              |
//! |-------------|-----------|--------------|-------------------------|
//! | vacant      | any       | any          | [`Transition::Filled`]    |
//! | held by P   | P         | `Correction` | [`Transition::Corrected`] |
//! | held by P   | P         | `NewTerm`    | [`Transition::Renewed`]   |
//! | held by Q   | P ≠ Q     | any          | [`Transition::Replaced`]  |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{
  Error, Result,
  cache::CacheKey,
  jurisdiction::Jurisdiction,
  tenure::{EndedReason, NewTenure, PositionHistory, TenurePatch},
};

// ─── Request ─────────────────────────────────────────────────────────────────

/// What a same-politician reassignment means. Only the caller knows whether
/// "same person, same seat" is a typo fix or a re-election.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentMode {
  /// Fix the current record in place; no history entry.
  Correction,
  /// Close the current record and open a new one, even for the same person.
  #[default]
  NewTerm,
}

impl From<bool> for AssignmentMode {
  /// `true` means "with history", as import pipelines express it.
  fn from(with_history: bool) -> Self {
    if with_history { Self::NewTerm } else { Self::Correction }
  }
}

/// A desired (politician, seat, term) assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
  pub politician_id: Uuid,
  pub position_id:   Uuid,
  pub jurisdiction:  Jurisdiction,
  pub term_start:    NaiveDate,
  pub term_end:      Option<NaiveDate>,
  pub party_id:      Option<Uuid>,
  pub election_id:   Option<Uuid>,
  pub created_by:    Option<Uuid>,
  #[serde(default)]
  pub mode:          AssignmentMode,
}

impl AssignmentRequest {
  pub fn new(
    politician_id: Uuid,
    position_id: Uuid,
    jurisdiction: Jurisdiction,
    term_start: NaiveDate,
  ) -> Self {
    Self {
      politician_id,
      position_id,
      jurisdiction,
      term_start,
      term_end: None,
      party_id: None,
      election_id: None,
      created_by: None,
      mode: AssignmentMode::default(),
    }
  }

  pub fn with_mode(mut self, mode: AssignmentMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn validate(&self) -> Result<()> {
    Error::check_term(self.term_start, self.term_end)
  }

  fn new_tenure(&self) -> NewTenure {
    NewTenure {
      politician_id: self.politician_id,
      position_id:   self.position_id,
      party_id:      self.party_id,
      jurisdiction:  self.jurisdiction,
      term_start:    self.term_start,
      term_end:      self.term_end,
      election_id:   self.election_id,
      created_by:    self.created_by,
    }
  }

  /// Corrections touch `term_start` plus whatever optional fields the caller
  /// supplied; absent fields stay as they are.
  fn correction_patch(&self) -> TenurePatch {
    TenurePatch {
      party_id:    self.party_id.map(Some),
      term_start:  Some(self.term_start),
      term_end:    self.term_end.map(Some),
      election_id: self.election_id.map(Some),
      is_current:  None,
    }
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transition {
  /// Vacant seat; a new current tenure was created.
  Filled,
  /// Same holder; the current tenure was updated in place.
  Corrected,
  /// Same holder; the old tenure was closed (`term_change`) and a new one
  /// opened.
  Renewed,
  /// Different holder; the old tenure was closed (`replaced`) and a new one
  /// opened.
  Replaced,
}

/// Pick the transition for `request` given the seat's `current` holder.
pub fn decide(
  current: Option<&PositionHistory>,
  request: &AssignmentRequest,
) -> Transition {
  match current {
    None => Transition::Filled,
    Some(holder) if holder.politician_id == request.politician_id => {
      match request.mode {
        AssignmentMode::Correction => Transition::Corrected,
        AssignmentMode::NewTerm => Transition::Renewed,
      }
    }
    Some(_) => Transition::Replaced,
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Closing the current tenure as part of a succession.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closure {
  pub id:     Uuid,
  pub end:    NaiveDate,
  pub reason: EndedReason,
}

/// The writes a store performs, in order, within one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
  Create(NewTenure),
  Correct { id: Uuid, patch: TenurePatch },
  Succeed { close: Closure, create: NewTenure },
}

/// Decide and expand into writes.
///
/// The outgoing tenure ends on the incoming term's start date, which must not
/// precede the outgoing tenure's own start.
pub fn plan(
  current: Option<&PositionHistory>,
  request: &AssignmentRequest,
) -> Result<(Transition, Plan)> {
  request.validate()?;

  let transition = decide(current, request);
  let plan = match (transition, current) {
    (Transition::Corrected, Some(holder)) => Plan::Correct {
      id:    holder.id,
      patch: request.correction_patch(),
    },
    (Transition::Renewed | Transition::Replaced, Some(holder)) => {
      Error::check_term(holder.term_start, Some(request.term_start))?;
      let reason = if transition == Transition::Renewed {
        EndedReason::TermChange
      } else {
        EndedReason::Replaced
      };
      Plan::Succeed {
        close:  Closure { id: holder.id, end: request.term_start, reason },
        create: request.new_tenure(),
      }
    }
    _ => Plan::Create(request.new_tenure()),
  };

  Ok((transition, plan))
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The result of a committed assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
  pub transition:    Transition,
  /// The tenure that is now current for the seat.
  pub current:       PositionHistory,
  /// The tenure closed by this assignment, for successions.
  pub closed:        Option<PositionHistory>,
  /// Cached views that are now stale.
  pub invalidations: Vec<CacheKey>,
}

impl AssignmentOutcome {
  pub fn new(
    transition: Transition,
    current: PositionHistory,
    closed: Option<PositionHistory>,
  ) -> Self {
    let invalidations =
      CacheKey::for_tenures(std::iter::once(&current).chain(closed.as_ref()));
    Self { transition, current, closed, invalidations }
  }
}
