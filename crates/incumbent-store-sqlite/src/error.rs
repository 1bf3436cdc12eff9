//! Error type for `incumbent-store-sqlite`.

use incumbent_core::{Classify, ErrorKind};
use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] incumbent_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value in database: {value:?}")]
  UnknownEnum { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Sqlite(e) => classify_sqlite(e),
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => classify_sqlite(e),
      Self::Database(_)
      | Self::Uuid(_)
      | Self::DateParse(_)
      | Self::UnknownEnum { .. } => ErrorKind::Transaction,
    }
  }

  fn is_cancelled(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_cancelled())
  }
}

/// Unique-index hits mean another writer got to the seat first; other
/// constraint failures are bad input.
fn classify_sqlite(err: &rusqlite::Error) -> ErrorKind {
  let rusqlite::Error::SqliteFailure(failure, _) = err else {
    return ErrorKind::Transaction;
  };
  match failure.code {
    ErrorCode::ConstraintViolation => match failure.extended_code {
      ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
        ErrorKind::Conflict
      }
      _ => ErrorKind::Validation,
    },
    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ErrorKind::Conflict,
    _ => ErrorKind::Transaction,
  }
}
