//! The `TenureStore` trait.
//!
//! Implemented by storage backends (e.g. `incumbent-store-sqlite`). The
//! [`Registry`](crate::registry::Registry) depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;
pub use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
  Classify,
  assignment::{AssignmentOutcome, AssignmentRequest},
  cache::CacheKey,
  jurisdiction::Jurisdiction,
  reference::{ElectionEvent, ElectionStatus, GovernmentPosition, NewPosition, Party, Politician},
  tenure::{EndedReason, NewTenure, PositionHistory, TenurePatch},
};

/// Result of [`TenureStore::bulk_archive_for_election`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveOutcome {
  /// Number of tenures closed by this call. Zero when every seat was already
  /// vacant or already archived.
  pub count:         usize,
  pub invalidations: Vec<CacheKey>,
}

/// Abstraction over a position-history backend.
///
/// Every write that changes more than one row, and every read-decide-write
/// sequence, must be atomic: on any error nothing is committed. Backends must
/// also guarantee that no two tenures for the same seat are current at once,
/// reporting a violation as an error whose [`Classify::kind`] is
/// [`Conflict`](crate::ErrorKind::Conflict).
///
/// Writes the registry runs under a deadline take a [`CancellationToken`].
/// Once it has fired a backend must not commit: it rolls back and returns an
/// error whose [`Classify::is_cancelled`] is true. A write that committed
/// before noticing the token reports its result as usual.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait TenureStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_politician(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Politician, Self::Error>> + Send + '_;

  fn get_politician(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Politician>, Self::Error>> + Send + '_;

  fn add_party(
    &self,
    name: String,
    abbreviation: Option<String>,
  ) -> impl Future<Output = Result<Party, Self::Error>> + Send + '_;

  fn add_position(
    &self,
    input: NewPosition,
  ) -> impl Future<Output = Result<GovernmentPosition, Self::Error>> + Send + '_;

  fn get_position(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<GovernmentPosition>, Self::Error>> + Send + '_;

  fn add_election(
    &self,
    name: String,
    election_date: NaiveDate,
  ) -> impl Future<Output = Result<ElectionEvent, Self::Error>> + Send + '_;

  fn get_election(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ElectionEvent>, Self::Error>> + Send + '_;

  fn set_election_status(
    &self,
    id: Uuid,
    status: ElectionStatus,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<ElectionEvent, Self::Error>> + Send + '_;

  // ── Tenure writes ─────────────────────────────────────────────────────

  /// Insert a new current tenure. Fails if the seat already has one.
  fn create(
    &self,
    input: NewTenure,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<PositionHistory, Self::Error>> + Send + '_;

  /// Run the assignment decision engine atomically: read the seat's current
  /// holder, decide, and apply the resulting writes.
  fn assign(
    &self,
    request: AssignmentRequest,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<AssignmentOutcome, Self::Error>> + Send + '_;

  /// Correct a current tenure in place.
  fn update(
    &self,
    id: Uuid,
    patch: TenurePatch,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<PositionHistory, Self::Error>> + Send + '_;

  /// Close one current tenure. Fails if `id` is unknown or already closed.
  fn end_term(
    &self,
    id: Uuid,
    end: NaiveDate,
    reason: EndedReason,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<PositionHistory, Self::Error>> + Send + '_;

  /// Close every current tenure for `position_ids`, tagging each with
  /// `election_id`.
  fn bulk_archive_for_election<'a>(
    &'a self,
    election_id: Uuid,
    position_ids: &'a [Uuid],
    as_of: NaiveDate,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<ArchiveOutcome, Self::Error>> + Send + 'a;

  /// Hard-delete a tenure entered in error. Returns the removed row.
  fn delete(
    &self,
    id: Uuid,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<PositionHistory, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PositionHistory>, Self::Error>> + Send + '_;

  /// The seat's current tenure, or `None` when vacant.
  fn current_holder<'a>(
    &'a self,
    position_id: Uuid,
    jurisdiction: &'a Jurisdiction,
  ) -> impl Future<Output = Result<Option<PositionHistory>, Self::Error>> + Send + 'a;

  /// Every tenure of a politician, current first, then newest term first.
  fn history(
    &self,
    politician_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PositionHistory>, Self::Error>> + Send + '_;

  /// Every tenure of a position across all jurisdictions, current first,
  /// then newest term first.
  fn holders(
    &self,
    position_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PositionHistory>, Self::Error>> + Send + '_;
}
