//! Synchronous statements executed on the connection thread.
//!
//! Everything here takes a plain `&Connection`; callers in
//! [`crate::store`] decide whether it runs inside a `BEGIN IMMEDIATE`
//! transaction. Multi-step operations (`assign`, `archive`) must.

use chrono::{DateTime, NaiveDate, Utc};
use incumbent_core::{
  Error as CoreError,
  assignment::{self, AssignmentOutcome, AssignmentRequest, Plan},
  cache::CacheKey,
  jurisdiction::Jurisdiction,
  store::ArchiveOutcome,
  tenure::{EndedReason, NewTenure, PositionHistory, TenurePatch},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RawTenure, TENURE_COLUMNS, encode_date, encode_dt, encode_uuid},
};

// ─── Reads ───────────────────────────────────────────────────────────────────

fn select_one(
  conn: &Connection,
  filter: &str,
  params: impl rusqlite::Params,
) -> Result<Option<PositionHistory>> {
  let sql = format!("SELECT {TENURE_COLUMNS} FROM position_history WHERE {filter}");
  let raw = conn.query_row(&sql, params, RawTenure::from_row).optional()?;
  raw.map(RawTenure::into_tenure).transpose()
}

fn select_many(
  conn: &Connection,
  filter: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<PositionHistory>> {
  let sql = format!(
    "SELECT {TENURE_COLUMNS} FROM position_history WHERE {filter}
     ORDER BY is_current DESC, term_start DESC, created_at DESC"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params, RawTenure::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawTenure::into_tenure).collect()
}

pub fn get(conn: &Connection, id: Uuid) -> Result<Option<PositionHistory>> {
  select_one(conn, "id = ?1", params![encode_uuid(id)])
}

pub fn current_holder(
  conn: &Connection,
  position_id: Uuid,
  jurisdiction: &Jurisdiction,
) -> Result<Option<PositionHistory>> {
  select_one(
    conn,
    "position_id = ?1 AND jurisdiction_key = ?2 AND is_current = 1",
    params![encode_uuid(position_id), jurisdiction.key()],
  )
}

pub fn history(conn: &Connection, politician_id: Uuid) -> Result<Vec<PositionHistory>> {
  select_many(conn, "politician_id = ?1", params![encode_uuid(politician_id)])
}

pub fn holders(conn: &Connection, position_id: Uuid) -> Result<Vec<PositionHistory>> {
  select_many(conn, "position_id = ?1", params![encode_uuid(position_id)])
}

/// Load a tenure that must exist and still be current.
fn require_current(conn: &Connection, id: Uuid) -> Result<PositionHistory> {
  match get(conn, id)? {
    None => Err(CoreError::TenureNotFound(id).into()),
    Some(t) if !t.is_current => Err(CoreError::NoCurrentTenure(id).into()),
    Some(t) => Ok(t),
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub fn insert(
  conn: &Connection,
  input: &NewTenure,
  now: DateTime<Utc>,
) -> Result<PositionHistory> {
  input.validate()?;

  let tenure = PositionHistory {
    id:            Uuid::new_v4(),
    politician_id: input.politician_id,
    position_id:   input.position_id,
    party_id:      input.party_id,
    jurisdiction:  input.jurisdiction,
    term_start:    input.term_start,
    term_end:      input.term_end,
    is_current:    true,
    ended_reason:  None,
    election_id:   input.election_id,
    created_by:    input.created_by,
    created_at:    now,
    updated_at:    now,
  };
  let scope = tenure.jurisdiction.to_scope();

  conn.execute(
    "INSERT INTO position_history (
       id, politician_id, position_id, party_id,
       is_national, region_id, province_id, city_id, barangay_id, district_id,
       jurisdiction_key, term_start, term_end, is_current, ended_reason,
       election_id, created_by, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
               ?11, ?12, ?13, 1, NULL, ?14, ?15, ?16, ?16)",
    params![
      encode_uuid(tenure.id),
      encode_uuid(tenure.politician_id),
      encode_uuid(tenure.position_id),
      tenure.party_id.map(encode_uuid),
      scope.is_national,
      scope.region_id.map(encode_uuid),
      scope.province_id.map(encode_uuid),
      scope.city_id.map(encode_uuid),
      scope.barangay_id.map(encode_uuid),
      scope.district_id.map(encode_uuid),
      tenure.jurisdiction.key(),
      encode_date(tenure.term_start),
      tenure.term_end.map(encode_date),
      tenure.election_id.map(encode_uuid),
      tenure.created_by.map(encode_uuid),
      encode_dt(now),
    ],
  )?;

  Ok(tenure)
}

/// Persist a patch. Re-checks inside the transaction that the tenure is still
/// current, so a correction never lands on a seat that was concurrently
/// handed over.
pub fn update(
  conn: &Connection,
  id: Uuid,
  patch: &TenurePatch,
  now: DateTime<Utc>,
) -> Result<PositionHistory> {
  let existing = match get(conn, id)? {
    Some(t) => t,
    None => return Err(CoreError::TenureNotFound(id).into()),
  };
  let mut next = patch.apply_to(&existing)?;
  next.updated_at = now;

  conn.execute(
    "UPDATE position_history
        SET party_id = ?2, term_start = ?3, term_end = ?4, election_id = ?5,
            is_current = ?6, ended_reason = ?7, updated_at = ?8
      WHERE id = ?1 AND is_current = 1",
    params![
      encode_uuid(id),
      next.party_id.map(encode_uuid),
      encode_date(next.term_start),
      next.term_end.map(encode_date),
      next.election_id.map(encode_uuid),
      next.is_current,
      next.ended_reason.map(|r| r.as_ref().to_owned()),
      encode_dt(now),
    ],
  )?;

  Ok(next)
}

/// Close one current tenure. `election_id`, when given, replaces the tag.
pub fn close(
  conn: &Connection,
  id: Uuid,
  end: NaiveDate,
  reason: EndedReason,
  election_id: Option<Uuid>,
  now: DateTime<Utc>,
) -> Result<PositionHistory> {
  let mut tenure = require_current(conn, id)?;
  CoreError::check_term(tenure.term_start, Some(end))?;

  conn.execute(
    "UPDATE position_history
        SET is_current = 0, term_end = ?2, ended_reason = ?3,
            election_id = COALESCE(?4, election_id), updated_at = ?5
      WHERE id = ?1 AND is_current = 1",
    params![
      encode_uuid(id),
      encode_date(end),
      reason.as_ref(),
      election_id.map(encode_uuid),
      encode_dt(now),
    ],
  )?;

  tenure.is_current = false;
  tenure.term_end = Some(end);
  tenure.ended_reason = Some(reason);
  tenure.election_id = election_id.or(tenure.election_id);
  tenure.updated_at = now;
  Ok(tenure)
}

pub fn delete(conn: &Connection, id: Uuid) -> Result<PositionHistory> {
  let tenure = get(conn, id)?.ok_or(CoreError::TenureNotFound(id))?;
  conn.execute("DELETE FROM position_history WHERE id = ?1", params![encode_uuid(id)])?;
  Ok(tenure)
}

// ─── Composite operations ────────────────────────────────────────────────────

/// Read the seat's holder, run the decision engine, apply its plan.
pub fn assign(
  conn: &Connection,
  request: &AssignmentRequest,
  now: DateTime<Utc>,
) -> Result<AssignmentOutcome> {
  let current = current_holder(conn, request.position_id, &request.jurisdiction)?;
  let (transition, plan) = assignment::plan(current.as_ref(), request)?;

  let (current, closed) = match plan {
    Plan::Create(input) => (insert(conn, &input, now)?, None),
    Plan::Correct { id, patch } => (update(conn, id, &patch, now)?, None),
    Plan::Succeed { close: c, create } => {
      let closed = close(conn, c.id, c.end, c.reason, None, now)?;
      (insert(conn, &create, now)?, Some(closed))
    }
  };

  Ok(AssignmentOutcome::new(transition, current, closed))
}

/// Close every current tenure of the given positions, tagging them with the
/// election. Seats that are vacant or already archived are skipped, so
/// re-running is a no-op.
pub fn archive(
  conn: &Connection,
  election_id: Uuid,
  position_ids: &[Uuid],
  as_of: NaiveDate,
  now: DateTime<Utc>,
) -> Result<ArchiveOutcome> {
  let mut closed = Vec::new();
  for &position_id in position_ids {
    let held = select_many(
      conn,
      "position_id = ?1 AND is_current = 1",
      params![encode_uuid(position_id)],
    )?;
    for tenure in held {
      // A tenure that began after the election still closes on its own start.
      let end = as_of.max(tenure.term_start);
      closed.push(close(
        conn,
        tenure.id,
        end,
        EndedReason::Election,
        Some(election_id),
        now,
      )?);
    }
  }

  Ok(ArchiveOutcome {
    count:         closed.len(),
    invalidations: CacheKey::for_tenures(&closed),
  })
}
