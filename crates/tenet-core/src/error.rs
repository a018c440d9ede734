//! Error types for `tenet-core`.
//!
//! [`Error`] is the domain taxonomy every storage backend classifies its
//! failures into. [`ErrorKind`] is the same taxonomy without payloads, which
//! is what the service facade matches on when choosing a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("value must be unique: {0}")]
  UniqueConstraint(String),

  #[error("value is referenced by another table or references a missing row: {0}")]
  ForeignKey(String),

  #[error("value cannot be null: {0}")]
  NotNull(String),

  #[error("action would violate a restriction: {0}")]
  Restrict(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("not a valid enum value: {0}")]
  EnumInvalid(String),

  #[error("not a valid UUID: {0:?}")]
  UuidInvalid(String),

  #[error("FQN must specify a value: {0:?}")]
  FqnMissingValue(String),

  #[error("invalid input: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("{0}")]
  Unknown(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The payload-free form of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  UniqueConstraint,
  ForeignKey,
  NotNull,
  Restrict,
  NotFound,
  EnumInvalid,
  UuidInvalid,
  FqnMissingValue,
  Validation,
  Unknown,
}

/// Implemented by every error that can surface from a policy store, so the
/// facade can map it to a status without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::UniqueConstraint(_) => ErrorKind::UniqueConstraint,
      Self::ForeignKey(_) => ErrorKind::ForeignKey,
      Self::NotNull(_) => ErrorKind::NotNull,
      Self::Restrict(_) => ErrorKind::Restrict,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::EnumInvalid(_) => ErrorKind::EnumInvalid,
      Self::UuidInvalid(_) => ErrorKind::UuidInvalid,
      Self::FqnMissingValue(_) => ErrorKind::FqnMissingValue,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Serialization(_) | Self::Unknown(_) => ErrorKind::Unknown,
    }
  }
}

/// Parse a canonical 36-character hyphenated UUID, mapping failure to
/// [`Error::UuidInvalid`]. Simple, braced and URN forms are rejected.
pub fn parse_uuid(raw: &str) -> Result<uuid::Uuid> {
  if raw.len() != 36 {
    return Err(Error::UuidInvalid(raw.to_owned()));
  }
  uuid::Uuid::try_parse(raw).map_err(|_| Error::UuidInvalid(raw.to_owned()))
}
