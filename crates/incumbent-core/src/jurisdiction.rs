//! Jurisdiction keys, the geographic half of a seat's identity.
//!
//! Requests arrive as a loose [`JurisdictionScope`] (a national flag plus five
//! optional area ids). They are resolved exactly once, at the boundary, into
//! a [`Jurisdiction`]; everything downstream matches on the enum.
//!
//! Resolution is first-match in a fixed priority order: national, region,
//! province, city, barangay, district. A senator is national; a councilor
//! belongs to one city. Fields after the first match are ignored.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Level ───────────────────────────────────────────────────────────────────

/// The administrative level of a resolved jurisdiction, in priority order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JurisdictionLevel {
  National,
  Region,
  Province,
  City,
  Barangay,
  District,
}

// ─── Resolved key ────────────────────────────────────────────────────────────

/// A resolved jurisdiction. Exactly one scope is meaningful per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum Jurisdiction {
  National,
  Region(Uuid),
  Province(Uuid),
  City(Uuid),
  Barangay(Uuid),
  District(Uuid),
}

impl Jurisdiction {
  pub fn level(&self) -> JurisdictionLevel {
    match self {
      Self::National => JurisdictionLevel::National,
      Self::Region(_) => JurisdictionLevel::Region,
      Self::Province(_) => JurisdictionLevel::Province,
      Self::City(_) => JurisdictionLevel::City,
      Self::Barangay(_) => JurisdictionLevel::Barangay,
      Self::District(_) => JurisdictionLevel::District,
    }
  }

  /// The area id, if this is not the national scope.
  pub fn area_id(&self) -> Option<Uuid> {
    match *self {
      Self::National => None,
      Self::Region(id)
      | Self::Province(id)
      | Self::City(id)
      | Self::Barangay(id)
      | Self::District(id) => Some(id),
    }
  }

  /// Canonical string form, e.g. `national` or `city:<uuid>`.
  ///
  /// Used as the storage uniqueness column and inside cache keys, so it must
  /// stay stable.
  pub fn key(&self) -> String {
    match self.area_id() {
      None => self.level().to_string(),
      Some(id) => format!("{}:{}", self.level(), id.hyphenated()),
    }
  }

  /// Project back onto the six persisted columns. Only the matching column
  /// is populated.
  pub fn to_scope(&self) -> JurisdictionScope {
    let mut scope = JurisdictionScope::default();
    match *self {
      Self::National => scope.is_national = true,
      Self::Region(id) => scope.region_id = Some(id),
      Self::Province(id) => scope.province_id = Some(id),
      Self::City(id) => scope.city_id = Some(id),
      Self::Barangay(id) => scope.barangay_id = Some(id),
      Self::District(id) => scope.district_id = Some(id),
    }
    scope
  }
}

impl fmt::Display for Jurisdiction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.key())
  }
}

impl FromStr for Jurisdiction {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidJurisdictionKey(s.to_owned());

    let (level, id) = match s.split_once(':') {
      Some((level, id)) => (level, Some(id)),
      None => (s, None),
    };
    let level = JurisdictionLevel::from_str(level).map_err(|_| invalid())?;
    let id = id
      .map(Uuid::parse_str)
      .transpose()
      .map_err(|_| invalid())?;

    match (level, id) {
      (JurisdictionLevel::National, None) => Ok(Self::National),
      (JurisdictionLevel::Region, Some(id)) => Ok(Self::Region(id)),
      (JurisdictionLevel::Province, Some(id)) => Ok(Self::Province(id)),
      (JurisdictionLevel::City, Some(id)) => Ok(Self::City(id)),
      (JurisdictionLevel::Barangay, Some(id)) => Ok(Self::Barangay(id)),
      (JurisdictionLevel::District, Some(id)) => Ok(Self::District(id)),
      _ => Err(invalid()),
    }
  }
}

// ─── Request shape ───────────────────────────────────────────────────────────

/// The raw jurisdiction fields as they arrive from a request or a database
/// row. Any number of them may be set; see [`JurisdictionScope::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionScope {
  #[serde(default)]
  pub is_national: bool,
  pub region_id:   Option<Uuid>,
  pub province_id: Option<Uuid>,
  pub city_id:     Option<Uuid>,
  pub barangay_id: Option<Uuid>,
  pub district_id: Option<Uuid>,
}

impl JurisdictionScope {
  /// Resolve to the first set field in priority order.
  ///
  /// Returns [`Error::MissingJurisdiction`] if nothing is set; callers must
  /// reject such requests before they reach a store.
  pub fn resolve(&self) -> Result<Jurisdiction> {
    if self.is_national {
      return Ok(Jurisdiction::National);
    }
    self
      .region_id
      .map(Jurisdiction::Region)
      .or(self.province_id.map(Jurisdiction::Province))
      .or(self.city_id.map(Jurisdiction::City))
      .or(self.barangay_id.map(Jurisdiction::Barangay))
      .or(self.district_id.map(Jurisdiction::District))
      .ok_or(Error::MissingJurisdiction)
  }
}

impl TryFrom<JurisdictionScope> for Jurisdiction {
  type Error = Error;

  fn try_from(scope: JurisdictionScope) -> Result<Self> { scope.resolve() }
}

impl From<Jurisdiction> for JurisdictionScope {
  fn from(j: Jurisdiction) -> Self { j.to_scope() }
}
