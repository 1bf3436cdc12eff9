//! [`Registry`]: the single outer layer over a [`TenureStore`] and a
//! [`Cache`].
//!
//! Stores decide and commit; the registry adds what sits around a commit:
//! deadlines, bounded retries on write conflicts, read-through caching, and
//! applying each mutation's invalidation list once the store has committed.
//! It also hosts the election archival coordinator.
//!
//! Cache fills are fenced against invalidations: a read that loaded from the
//! store before a write committed never stores its result after that write's
//! invalidation has run.

use std::{future::Future, time::Duration};

use backon::{BackoffBuilder as _, ExponentialBackoff, ExponentialBuilder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Classify, Error, ErrorKind, Result,
  assignment::{AssignmentOutcome, AssignmentRequest},
  cache::{self, Cache, CacheKey, NoCache},
  jurisdiction::{Jurisdiction, JurisdictionScope},
  reference::{ElectionEvent, ElectionStatus},
  store::{CancellationToken, TenureStore},
  tenure::{EndedReason, PositionHistory, TenurePatch},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime knobs, deserialised from the `[registry]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// How many times an assignment is retried after a write conflict before
  /// the conflict is surfaced.
  pub max_conflict_retries: u32,
  /// Deadline for each store call, in milliseconds.
  pub op_timeout_ms:        u64,
  /// First backoff delay between conflict retries, in milliseconds.
  pub retry_min_delay_ms:   u64,
  /// Cap on the backoff delay, in milliseconds.
  pub retry_max_delay_ms:   u64,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      max_conflict_retries: 3,
      op_timeout_ms:        5_000,
      retry_min_delay_ms:   10,
      retry_max_delay_ms:   200,
    }
  }
}

impl RegistryConfig {
  pub fn op_timeout(&self) -> Duration { Duration::from_millis(self.op_timeout_ms) }

  /// Jittered exponential delays, one per allowed conflict retry.
  pub fn conflict_backoff(&self) -> ExponentialBackoff {
    ExponentialBuilder::default()
      .with_min_delay(Duration::from_millis(self.retry_min_delay_ms))
      .with_max_delay(Duration::from_millis(self.retry_max_delay_ms))
      .with_max_times(self.max_conflict_retries as usize)
      .with_jitter()
      .build()
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Result of [`Registry::archive_for_election`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionArchive {
  /// The election, as updated.
  pub election: ElectionEvent,
  /// Tenures closed by this call.
  pub archived: usize,
}

// ─── Registry ────────────────────────────────────────────────────────────────

pub struct Registry<S, C = NoCache> {
  store:      S,
  cache:      C,
  config:     RegistryConfig,
  /// Bumped by every invalidation. Held while a cache fill checks it and
  /// writes, so a fill and an invalidation never interleave.
  generation: Mutex<u64>,
}

impl<S: TenureStore> Registry<S, NoCache> {
  /// A registry with caching disabled.
  pub fn uncached(store: S, config: RegistryConfig) -> Self {
    Self::new(store, NoCache, config)
  }
}

impl<S, C> Registry<S, C>
where
  S: TenureStore,
  C: Cache,
{
  pub fn new(store: S, cache: C, config: RegistryConfig) -> Self {
    Self { store, cache, config, generation: Mutex::new(0) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn cache(&self) -> &C { &self.cache }

  pub fn config(&self) -> &RegistryConfig { &self.config }

  // ── Plumbing ──────────────────────────────────────────────────────────

  /// Run one store read under the configured deadline.
  async fn run<T, F>(&self, op: F) -> Result<T>
  where
    F: Future<Output = Result<T, S::Error>>,
  {
    let limit = self.config.op_timeout();
    match tokio::time::timeout(limit, op).await {
      Ok(result) => result.map_err(Error::store),
      Err(_) => Err(Error::Timeout(limit)),
    }
  }

  /// Run one store write under the configured deadline.
  ///
  /// When the deadline passes the write is cancelled, then awaited until the
  /// store settles. A write that rolled back is reported as
  /// [`Error::Timeout`]; one that had already committed returns its result,
  /// so the caller never sees a timeout for a write that landed.
  async fn write<T, F, Fut>(&self, op: F) -> Result<T>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, S::Error>>,
  {
    let limit = self.config.op_timeout();
    let cancel = CancellationToken::new();
    let op = op(cancel.clone());
    tokio::pin!(op);

    tokio::select! {
      result = &mut op => return result.map_err(Error::store),
      () = tokio::time::sleep(limit) => cancel.cancel(),
    }

    match op.await {
      Ok(value) => {
        warn!(?limit, "store write committed after its deadline");
        Ok(value)
      }
      Err(e) if e.is_cancelled() => Err(Error::Timeout(limit)),
      Err(e) => Err(Error::store(e)),
    }
  }

  async fn invalidate(&self, keys: &[CacheKey]) {
    if keys.is_empty() {
      return;
    }
    let mut generation = self.generation.lock().await;
    *generation += 1;
    for key in keys {
      let prefix = key.prefix();
      match self.cache.invalidate_prefix(&prefix).await {
        Ok(dropped) => debug!(%prefix, dropped, "cache invalidated"),
        Err(e) => warn!(%prefix, error = %e, "cache invalidation failed"),
      }
    }
  }

  /// Read through the cache. Cache failures degrade to a store read.
  async fn cached<T, F>(&self, key: String, load: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: Future<Output = Result<T, S::Error>>,
  {
    match self.cache.get(&key).await {
      Ok(Some(raw)) => match serde_json::from_str(&raw) {
        Ok(value) => {
          debug!(%key, "cache hit");
          return Ok(value);
        }
        Err(e) => warn!(%key, error = %e, "discarding undecodable cache entry"),
      },
      Ok(None) => debug!(%key, "cache miss"),
      Err(e) => warn!(%key, error = %e, "cache read failed"),
    }

    let seen = *self.generation.lock().await;
    let value = self.run(load).await?;

    let generation = self.generation.lock().await;
    if *generation != seen {
      debug!(%key, "skipping cache fill; a write landed during the load");
      return Ok(value);
    }
    match serde_json::to_string(&value) {
      Ok(raw) => {
        if let Err(e) = self.cache.set(key.clone(), raw).await {
          warn!(%key, error = %e, "cache write failed");
        }
      }
      Err(e) => warn!(%key, error = %e, "cache encode failed"),
    }
    Ok(value)
  }

  // ── Assignment ────────────────────────────────────────────────────────

  /// Assign a politician to a seat, retrying on write conflicts with
  /// jittered exponential backoff.
  pub async fn assign(&self, request: AssignmentRequest) -> Result<AssignmentOutcome> {
    request.validate()?;

    let mut backoff = self.config.conflict_backoff();
    let mut attempt = 0;
    loop {
      let req = request.clone();
      match self.write(move |cancel| self.store.assign(req, cancel)).await {
        Ok(outcome) => {
          info!(
            transition = %outcome.transition,
            position_id = %request.position_id,
            jurisdiction = %request.jurisdiction,
            politician_id = %request.politician_id,
            tenure_id = %outcome.current.id,
            closed_id = ?outcome.closed.as_ref().map(|t| t.id),
            "seat assignment committed"
          );
          self.invalidate(&outcome.invalidations).await;
          return Ok(outcome);
        }
        Err(e) if e.kind() == ErrorKind::Conflict => {
          let Some(delay) = backoff.next() else {
            return Err(e);
          };
          attempt += 1;
          warn!(
            attempt,
            ?delay,
            position_id = %request.position_id,
            jurisdiction = %request.jurisdiction,
            error = %e,
            "seat assignment conflicted; retrying"
          );
          tokio::time::sleep(delay).await;
        }
        Err(e) => return Err(e),
      }
    }
  }

  // ── Direct tenure edits ───────────────────────────────────────────────

  pub async fn update(&self, id: Uuid, patch: TenurePatch) -> Result<PositionHistory> {
    let tenure = self
      .write(move |cancel| self.store.update(id, patch, cancel))
      .await?;
    info!(tenure_id = %id, "tenure corrected");
    self.invalidate(&CacheKey::for_tenures([&tenure])).await;
    Ok(tenure)
  }

  pub async fn end_term(
    &self,
    id: Uuid,
    end: NaiveDate,
    reason: EndedReason,
  ) -> Result<PositionHistory> {
    let tenure = self
      .write(move |cancel| self.store.end_term(id, end, reason, cancel))
      .await?;
    info!(tenure_id = %id, %end, %reason, "term ended");
    self.invalidate(&CacheKey::for_tenures([&tenure])).await;
    Ok(tenure)
  }

  pub async fn delete(&self, id: Uuid) -> Result<PositionHistory> {
    let tenure = self
      .write(move |cancel| self.store.delete(id, cancel))
      .await?;
    warn!(tenure_id = %id, politician_id = %tenure.politician_id, "tenure deleted");
    self.invalidate(&CacheKey::for_tenures([&tenure])).await;
    Ok(tenure)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get(&self, id: Uuid) -> Result<PositionHistory> {
    self
      .run(self.store.get(id))
      .await?
      .ok_or(Error::TenureNotFound(id))
  }

  pub async fn current_holder(
    &self,
    position_id: Uuid,
    jurisdiction: &Jurisdiction,
  ) -> Result<Option<PositionHistory>> {
    self
      .cached(
        cache::current_holder_key(position_id, jurisdiction),
        self.store.current_holder(position_id, jurisdiction),
      )
      .await
  }

  /// Like [`Self::current_holder`], resolving a raw request scope first.
  pub async fn current_holder_in(
    &self,
    position_id: Uuid,
    scope: JurisdictionScope,
  ) -> Result<Option<PositionHistory>> {
    let jurisdiction = scope.resolve()?;
    self.current_holder(position_id, &jurisdiction).await
  }

  pub async fn history(&self, politician_id: Uuid) -> Result<Vec<PositionHistory>> {
    self
      .cached(cache::history_key(politician_id), self.store.history(politician_id))
      .await
  }

  pub async fn holders(&self, position_id: Uuid) -> Result<Vec<PositionHistory>> {
    self
      .cached(cache::holders_key(position_id), self.store.holders(position_id))
      .await
  }

  // ── Election archival ─────────────────────────────────────────────────

  /// Close out every current tenure for `position_ids` ahead of importing
  /// `election_id`'s results, then mark the election in progress.
  ///
  /// Safe to re-run after a partial failure: seats already archived are
  /// skipped, and the status change is idempotent.
  pub async fn archive_for_election(
    &self,
    election_id: Uuid,
    position_ids: &[Uuid],
  ) -> Result<ElectionArchive> {
    let election = self
      .run(self.store.get_election(election_id))
      .await?
      .ok_or(Error::ElectionNotFound(election_id))?;

    if !election.status.is_open() {
      return Err(Error::ElectionClosed(election_id, election.status.to_string()));
    }

    let outcome = self
      .write(|cancel| {
        self.store.bulk_archive_for_election(
          election_id,
          position_ids,
          election.election_date,
          cancel,
        )
      })
      .await?;
    self.invalidate(&outcome.invalidations).await;

    let election = if election.status == ElectionStatus::InProgress {
      election
    } else {
      self
        .write(|cancel| {
          self.store.set_election_status(election_id, ElectionStatus::InProgress, cancel)
        })
        .await?
    };

    info!(
      %election_id,
      positions = position_ids.len(),
      archived = outcome.count,
      "seats archived for election"
    );
    Ok(ElectionArchive { election, archived: outcome.count })
  }
}
