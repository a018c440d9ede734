//! Error type for `tenet-store-sqlite`.
//!
//! Every database failure passes through [`From<rusqlite::Error>`] or
//! [`From<tokio_rusqlite::Error>`], which classify constraint violations
//! into the policy error taxonomy. Anything left unclassified stays a
//! [`Error::Database`] and surfaces as an internal error.

use rusqlite::{ErrorCode, ffi};
use tenet_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Policy(#[from] tenet_core::Error),

  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("schema is at version {found} but {expected} is required")]
  PendingMigrations { found: i64, expected: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Map a SQLite failure onto the policy taxonomy, if it belongs there.
fn classify(err: &rusqlite::Error) -> Option<tenet_core::Error> {
  match err {
    rusqlite::Error::QueryReturnedNoRows => {
      Some(tenet_core::Error::NotFound("no matching row".into()))
    }
    rusqlite::Error::SqliteFailure(code, message)
      if code.code == ErrorCode::ConstraintViolation =>
    {
      let detail = message.clone().unwrap_or_else(|| code.to_string());
      match code.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
          Some(tenet_core::Error::UniqueConstraint(detail))
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
          Some(tenet_core::Error::ForeignKey(detail))
        }
        ffi::SQLITE_CONSTRAINT_NOTNULL => Some(tenet_core::Error::NotNull(detail)),
        ffi::SQLITE_CONSTRAINT_CHECK => {
          Some(tenet_core::Error::EnumInvalid(detail))
        }
        ffi::SQLITE_CONSTRAINT_TRIGGER => {
          Some(tenet_core::Error::Restrict(detail))
        }
        _ => None,
      }
    }
    _ => None,
  }
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    match classify(&err) {
      Some(policy) => Self::Policy(policy),
      None => Self::Database(tokio_rusqlite::Error::Rusqlite(err)),
    }
  }
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(inner) => Self::from(inner),
      // Policy errors raised inside a connection closure travel boxed.
      tokio_rusqlite::Error::Other(boxed) => {
        match boxed.downcast::<tenet_core::Error>() {
          Ok(policy) => Self::Policy(*policy),
          Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
        }
      }
      other => Self::Database(other),
    }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Policy(e) => e.kind(),
      _ => ErrorKind::Unknown,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn constraint(extended_code: i32) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
      ffi::Error { code: ErrorCode::ConstraintViolation, extended_code },
      Some("constraint failed".into()),
    )
  }

  #[test]
  fn constraint_codes_map_to_policy_kinds() {
    let cases = [
      (ffi::SQLITE_CONSTRAINT_UNIQUE, ErrorKind::UniqueConstraint),
      (ffi::SQLITE_CONSTRAINT_PRIMARYKEY, ErrorKind::UniqueConstraint),
      (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, ErrorKind::ForeignKey),
      (ffi::SQLITE_CONSTRAINT_NOTNULL, ErrorKind::NotNull),
      (ffi::SQLITE_CONSTRAINT_CHECK, ErrorKind::EnumInvalid),
      (ffi::SQLITE_CONSTRAINT_TRIGGER, ErrorKind::Restrict),
    ];
    for (code, kind) in cases {
      assert_eq!(Error::from(constraint(code)).kind(), kind);
    }
  }

  #[test]
  fn no_rows_is_not_found() {
    let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn boxed_policy_errors_are_unwrapped() {
    let boxed = tokio_rusqlite::Error::Other(Box::new(
      tenet_core::Error::Validation("bad".into()),
    ));
    assert_eq!(Error::from(boxed).kind(), ErrorKind::Validation);
  }

  #[test]
  fn other_failures_are_unknown() {
    let err = Error::from(rusqlite::Error::InvalidQuery);
    assert!(matches!(err, Error::Database(_)));
    assert_eq!(err.kind(), ErrorKind::Unknown);
  }
}
