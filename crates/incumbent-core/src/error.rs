//! Error types for `incumbent-core`.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse failure class of an error, shared by every crate in the
/// workspace. Callers branch on this rather than on concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// The record, politician, position or election does not exist.
  NotFound,
  /// Missing or inconsistent input, or a referential-integrity violation.
  Validation,
  /// A concurrent writer changed the seat first. Safe to retry.
  Conflict,
  /// The store or its transaction failed. The operation rolled back.
  Transaction,
}

/// Implemented by every error type that can cross the store boundary.
pub trait Classify {
  fn kind(&self) -> ErrorKind;

  /// True when the operation gave up because its cancellation token fired
  /// and nothing was committed.
  fn is_cancelled(&self) -> bool { false }
}

// ─── Error ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("tenure not found: {0}")]
  TenureNotFound(Uuid),

  #[error("no current tenure with id {0}")]
  NoCurrentTenure(Uuid),

  #[error("tenure {0} is closed and can no longer be corrected")]
  TenureClosed(Uuid),

  #[error("politician not found: {0}")]
  PoliticianNotFound(Uuid),

  #[error("position not found: {0}")]
  PositionNotFound(Uuid),

  #[error("election not found: {0}")]
  ElectionNotFound(Uuid),

  #[error("election {0} is already {1} and cannot be archived")]
  ElectionClosed(Uuid, String),

  #[error("jurisdiction is missing: set the national flag or one area id")]
  MissingJurisdiction,

  #[error("invalid jurisdiction key: {0:?}")]
  InvalidJurisdictionKey(String),

  #[error("term ending {end} precedes its start {start}")]
  InvalidTerm { start: NaiveDate, end: NaiveDate },

  #[error("closing a tenure through an update requires a term end date")]
  MissingTermEnd,

  #[error("seat already has a current holder: {0}")]
  SeatConflict(String),

  #[error("operation timed out after {0:?}")]
  Timeout(Duration),

  #[error("write cancelled before commit")]
  Cancelled,

  #[error("store error: {source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error, keeping its classification.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: err.kind(), source: Box::new(err) }
  }

  /// Reject a date range whose end precedes its start.
  pub fn check_term(start: NaiveDate, end: Option<NaiveDate>) -> Result<()> {
    match end {
      Some(end) if end < start => Err(Self::InvalidTerm { start, end }),
      _ => Ok(()),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::TenureNotFound(_)
      | Self::NoCurrentTenure(_)
      | Self::PoliticianNotFound(_)
      | Self::PositionNotFound(_)
      | Self::ElectionNotFound(_) => ErrorKind::NotFound,
      Self::TenureClosed(_)
      | Self::ElectionClosed(..)
      | Self::MissingJurisdiction
      | Self::InvalidJurisdictionKey(_)
      | Self::InvalidTerm { .. }
      | Self::MissingTermEnd => ErrorKind::Validation,
      Self::SeatConflict(_) => ErrorKind::Conflict,
      Self::Timeout(_) | Self::Cancelled | Self::Serialization(_) => {
        ErrorKind::Transaction
      }
      Self::Store { kind, .. } => *kind,
    }
  }

  fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
