//! The cache seam.
//!
//! The registry memoises current-holder and history reads in an external
//! key-value cache, and every mutation reports which entries it made stale as
//! a list of [`CacheKey`]s. Each key names a prefix; all view keys for that
//! politician or position live under it.
//!
//! The cache is best-effort. It is never consulted for the one-holder-per-seat
//! invariant.

use std::{collections::BTreeMap, convert::Infallible, future::Future};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{jurisdiction::Jurisdiction, tenure::PositionHistory};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A family of cached views that a mutation invalidates together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum CacheKey {
  Politician(Uuid),
  Position(Uuid),
}

impl CacheKey {
  pub fn prefix(&self) -> String {
    match self {
      Self::Politician(id) => format!("politician:{id}"),
      Self::Position(id) => format!("position:{id}"),
    }
  }

  /// Keys affected by touching these tenures, deduplicated, in first-seen
  /// order.
  pub fn for_tenures<'a>(
    tenures: impl IntoIterator<Item = &'a PositionHistory>,
  ) -> Vec<Self> {
    let mut keys = Vec::new();
    for t in tenures {
      for key in [Self::Politician(t.politician_id), Self::Position(t.position_id)]
      {
        if !keys.contains(&key) {
          keys.push(key);
        }
      }
    }
    keys
  }
}

/// Cache key for a seat's current holder.
pub fn current_holder_key(position_id: Uuid, jurisdiction: &Jurisdiction) -> String {
  format!("{}:current:{}", CacheKey::Position(position_id).prefix(), jurisdiction.key())
}

/// Cache key for every tenure of a position.
pub fn holders_key(position_id: Uuid) -> String {
  format!("{}:holders", CacheKey::Position(position_id).prefix())
}

/// Cache key for a politician's tenure history.
pub fn history_key(politician_id: Uuid) -> String {
  format!("{}:history", CacheKey::Politician(politician_id).prefix())
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A string-valued key-value cache with prefix invalidation.
pub trait Cache: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set(
    &self,
    key: String,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Drop every entry whose key starts with `prefix`. Returns how many were
  /// dropped, where the backend can tell.
  fn invalidate_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}

// ─── In-process implementation ───────────────────────────────────────────────

/// An in-process cache. Ordered storage makes prefix invalidation a range
/// scan.
#[derive(Debug, Default)]
pub struct MemoryCache {
  entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }

  pub async fn len(&self) -> usize { self.entries.read().await.len() }

  pub async fn is_empty(&self) -> bool { self.entries.read().await.is_empty() }
}

impl Cache for MemoryCache {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.entries.read().await.get(key).cloned())
  }

  async fn set(&self, key: String, value: String) -> Result<(), Infallible> {
    self.entries.write().await.insert(key, value);
    Ok(())
  }

  async fn invalidate_prefix(&self, prefix: &str) -> Result<usize, Infallible> {
    let mut entries = self.entries.write().await;
    let stale: Vec<String> = entries
      .range(prefix.to_owned()..)
      .take_while(|(k, _)| k.starts_with(prefix))
      .map(|(k, _)| k.clone())
      .collect();
    for key in &stale {
      entries.remove(key);
    }
    Ok(stale.len())
  }
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl Cache for NoCache {
  type Error = Infallible;

  async fn get(&self, _key: &str) -> Result<Option<String>, Infallible> {
    Ok(None)
  }

  async fn set(&self, _key: String, _value: String) -> Result<(), Infallible> {
    Ok(())
  }

  async fn invalidate_prefix(&self, _prefix: &str) -> Result<usize, Infallible> {
    Ok(0)
  }
}
