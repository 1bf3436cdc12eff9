//! [`SqliteStore`]: the SQLite implementation of [`TenureStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use incumbent_core::{
  Error as CoreError,
  assignment::{AssignmentOutcome, AssignmentRequest},
  jurisdiction::Jurisdiction,
  reference::{
    ElectionEvent, ElectionStatus, GovernmentPosition, NewPosition, Party, Politician,
  },
  store::{ArchiveOutcome, CancellationToken, TenureStore},
  tenure::{EndedReason, NewTenure, PositionHistory, TenurePatch},
};

use crate::{
  Result,
  encode::{
    ELECTION_COLUMNS, RawElection, RawPolitician, RawPosition, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
  tx,
};

/// How long a writer waits for another connection's write lock before the
/// attempt is reported as a conflict.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// An officeholder store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    debug!(path = %path.as_ref().display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
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
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction, committing only if it
  /// succeeds. The write lock is taken before the first read, so a
  /// read-decide-write sequence cannot interleave with another writer.
  ///
  /// `cancel` is checked once the lock is held and again just before the
  /// commit; if it has fired the transaction is rolled back and
  /// [`CoreError::Cancelled`] returned.
  async fn write<T, F>(&self, cancel: CancellationToken, f: F) -> Result<T>
  where
    F: FnOnce(&Connection, DateTime<Utc>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if cancel.is_cancelled() {
          debug!("write cancelled while waiting for the lock");
          return Ok(Err(CoreError::Cancelled.into()));
        }
        // Dropping `tx` rolls back.
        match f(&tx, Utc::now()) {
          Ok(_) if cancel.is_cancelled() => {
            debug!("write cancelled before commit; rolling back");
            Ok(Err(CoreError::Cancelled.into()))
          }
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }
}

// ─── TenureStore impl ────────────────────────────────────────────────────────

impl TenureStore for SqliteStore {
  type Error = crate::Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_politician(&self, name: String) -> Result<Politician> {
    self
      .write(CancellationToken::new(), move |conn, now| {
        let politician = Politician { politician_id: Uuid::new_v4(), name, created_at: now };
        conn.execute(
          "INSERT INTO politicians (politician_id, name, created_at) VALUES (?1, ?2, ?3)",
          params![
            encode_uuid(politician.politician_id),
            politician.name,
            encode_dt(now)
          ],
        )?;
        Ok(politician)
      })
      .await
  }

  async fn get_politician(&self, id: Uuid) -> Result<Option<Politician>> {
    let raw: Option<RawPolitician> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT politician_id, name, created_at FROM politicians WHERE politician_id = ?1",
              params![encode_uuid(id)],
              |row| {
                Ok(RawPolitician {
                  politician_id: row.get(0)?,
                  name:          row.get(1)?,
                  created_at:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPolitician::into_politician).transpose()
  }

  async fn add_party(&self, name: String, abbreviation: Option<String>) -> Result<Party> {
    self
      .write(CancellationToken::new(), move |conn, now| {
        let party = Party { party_id: Uuid::new_v4(), name, abbreviation, created_at: now };
        conn.execute(
          "INSERT INTO parties (party_id, name, abbreviation, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![
            encode_uuid(party.party_id),
            party.name,
            party.abbreviation,
            encode_dt(now)
          ],
        )?;
        Ok(party)
      })
      .await
  }

  async fn add_position(&self, input: NewPosition) -> Result<GovernmentPosition> {
    self
      .write(CancellationToken::new(), move |conn, now| {
        let position = GovernmentPosition {
          position_id: Uuid::new_v4(),
          name:        input.name,
          level:       input.level,
          branch:      input.branch,
          is_elected:  input.is_elected,
          max_terms:   input.max_terms,
          term_years:  input.term_years,
          created_at:  now,
        };
        conn.execute(
          "INSERT INTO government_positions (
             position_id, name, level, branch, is_elected, max_terms, term_years, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            encode_uuid(position.position_id),
            position.name,
            position.level.as_ref(),
            position.branch.as_ref(),
            position.is_elected,
            position.max_terms,
            position.term_years,
            encode_dt(now),
          ],
        )?;
        Ok(position)
      })
      .await
  }

  async fn get_position(&self, id: Uuid) -> Result<Option<GovernmentPosition>> {
    let raw: Option<RawPosition> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT position_id, name, level, branch, is_elected, max_terms, term_years,
                      created_at
                 FROM government_positions WHERE position_id = ?1",
              params![encode_uuid(id)],
              |row| {
                Ok(RawPosition {
                  position_id: row.get(0)?,
                  name:        row.get(1)?,
                  level:       row.get(2)?,
                  branch:      row.get(3)?,
                  is_elected:  row.get(4)?,
                  max_terms:   row.get(5)?,
                  term_years:  row.get(6)?,
                  created_at:  row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPosition::into_position).transpose()
  }

  async fn add_election(&self, name: String, election_date: NaiveDate) -> Result<ElectionEvent> {
    self
      .write(CancellationToken::new(), move |conn, now| {
        let election = ElectionEvent {
          election_id: Uuid::new_v4(),
          name,
          election_date,
          status: ElectionStatus::default(),
          created_at: now,
          updated_at: now,
        };
        conn.execute(
          "INSERT INTO elections (
             election_id, name, election_date, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          params![
            encode_uuid(election.election_id),
            election.name,
            encode_date(election_date),
            election.status.as_ref(),
            encode_dt(now),
          ],
        )?;
        Ok(election)
      })
      .await
  }

  async fn get_election(&self, id: Uuid) -> Result<Option<ElectionEvent>> {
    let raw: Option<RawElection> = self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ELECTION_COLUMNS} FROM elections WHERE election_id = ?1"),
              params![encode_uuid(id)],
              RawElection::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawElection::into_election).transpose()
  }

  async fn set_election_status(
    &self,
    id: Uuid,
    status: ElectionStatus,
    cancel: CancellationToken,
  ) -> Result<ElectionEvent> {
    let raw: RawElection = self
      .write(cancel, move |conn, now| {
        let changed = conn.execute(
          "UPDATE elections SET status = ?2, updated_at = ?3 WHERE election_id = ?1",
          params![encode_uuid(id), status.as_ref(), encode_dt(now)],
        )?;
        if changed == 0 {
          return Err(CoreError::ElectionNotFound(id).into());
        }
        Ok(conn.query_row(
          &format!("SELECT {ELECTION_COLUMNS} FROM elections WHERE election_id = ?1"),
          params![encode_uuid(id)],
          RawElection::from_row,
        )?)
      })
      .await?;

    raw.into_election()
  }

  // ── Tenure writes ─────────────────────────────────────────────────────────

  async fn create(
    &self,
    input: NewTenure,
    cancel: CancellationToken,
  ) -> Result<PositionHistory> {
    self.write(cancel, move |conn, now| tx::insert(conn, &input, now)).await
  }

  async fn assign(
    &self,
    request: AssignmentRequest,
    cancel: CancellationToken,
  ) -> Result<AssignmentOutcome> {
    self.write(cancel, move |conn, now| tx::assign(conn, &request, now)).await
  }

  async fn update(
    &self,
    id: Uuid,
    patch: TenurePatch,
    cancel: CancellationToken,
  ) -> Result<PositionHistory> {
    self.write(cancel, move |conn, now| tx::update(conn, id, &patch, now)).await
  }

  async fn end_term(
    &self,
    id: Uuid,
    end: NaiveDate,
    reason: EndedReason,
    cancel: CancellationToken,
  ) -> Result<PositionHistory> {
    self
      .write(cancel, move |conn, now| tx::close(conn, id, end, reason, None, now))
      .await
  }

  async fn bulk_archive_for_election(
    &self,
    election_id: Uuid,
    position_ids: &[Uuid],
    as_of: NaiveDate,
    cancel: CancellationToken,
  ) -> Result<ArchiveOutcome> {
    let position_ids = position_ids.to_vec();
    self
      .write(cancel, move |conn, now| {
        tx::archive(conn, election_id, &position_ids, as_of, now)
      })
      .await
  }

  async fn delete(&self, id: Uuid, cancel: CancellationToken) -> Result<PositionHistory> {
    self.write(cancel, move |conn, _| tx::delete(conn, id)).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: Uuid) -> Result<Option<PositionHistory>> {
    self.read(move |conn| tx::get(conn, id)).await
  }

  async fn current_holder(
    &self,
    position_id: Uuid,
    jurisdiction: &Jurisdiction,
  ) -> Result<Option<PositionHistory>> {
    let jurisdiction = *jurisdiction;
    self
      .read(move |conn| tx::current_holder(conn, position_id, &jurisdiction))
      .await
  }

  async fn history(&self, politician_id: Uuid) -> Result<Vec<PositionHistory>> {
    self.read(move |conn| tx::history(conn, politician_id)).await
  }

  async fn holders(&self, position_id: Uuid) -> Result<Vec<PositionHistory>> {
    self.read(move |conn| tx::holders(conn, position_id)).await
  }
}
