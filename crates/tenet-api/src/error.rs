//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaving the facade goes through [`handle_error`], which
//! classifies it and swaps the backend's message for a stable one. Errors the
//! caller cannot act on surface only the operation's fallback text.

use std::fmt;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tenet_core::{Classify, ErrorKind};
use thiserror::Error;
use tracing::error;

// ─── Stable messages ─────────────────────────────────────────────────────────

pub const ALREADY_EXISTS: &str = "resource unique field violation";
pub const NOT_FOUND: &str = "resource not found";
pub const RELATION_INVALID: &str = "resource relation invalid";
pub const ENUM_INVALID: &str = "enum value invalid";
pub const UUID_INVALID: &str = "invalid input syntax for type uuid";
pub const RESTRICTED: &str = "intended action would violate a restriction";
pub const FQN_MISSING_VALUE: &str = "FQN must specify a valid value and be of \
                                     format 'https://<namespace>/attr/<attribute \
                                     name>/value/<value>'";

// Fallbacks, one per kind of operation.
pub const CREATION_FAILED: &str = "resource creation failed";
pub const RETRIEVAL_FAILED: &str = "resource retrieval failed";
pub const LIST_RETRIEVAL_FAILED: &str = "resource list retrieval failed";
pub const UPDATE_FAILED: &str = "resource update failed";
pub const DEACTIVATION_FAILED: &str = "resource deactivation failed";
pub const DELETION_FAILED: &str = "resource deletion failed";

// ─── Error ───────────────────────────────────────────────────────────────────

/// Transport status of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
  AlreadyExists,
  InvalidArgument,
  NotFound,
  Internal,
}

impl Code {
  pub fn status(self) -> StatusCode {
    match self {
      Self::AlreadyExists => StatusCode::CONFLICT,
      Self::InvalidArgument => StatusCode::BAD_REQUEST,
      Self::NotFound => StatusCode::NOT_FOUND,
      Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// An error returned by the facade or an API handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
  pub code:    Code,
  pub message: String,
}

impl ApiError {
  pub fn new(code: Code, message: impl Into<String>) -> Self {
    Self { code, message: message.into() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.code.status(), Json(json!({ "error": self.message }))).into_response()
  }
}

/// Classify `err` into a transport error, logging the original.
///
/// `fallback` names the operation and is what the caller sees when the
/// error is not one of the recognised kinds.
pub fn handle_error<E>(err: &E, fallback: &'static str) -> ApiError
where
  E: Classify + fmt::Display + ?Sized,
{
  let kind = err.kind();
  let (code, message) = match kind {
    ErrorKind::UniqueConstraint => (Code::AlreadyExists, ALREADY_EXISTS.into()),
    ErrorKind::NotFound => (Code::NotFound, NOT_FOUND.into()),
    ErrorKind::ForeignKey => (Code::InvalidArgument, RELATION_INVALID.into()),
    ErrorKind::EnumInvalid => (Code::InvalidArgument, ENUM_INVALID.into()),
    ErrorKind::UuidInvalid => (Code::InvalidArgument, UUID_INVALID.into()),
    ErrorKind::Restrict => (Code::InvalidArgument, RESTRICTED.into()),
    ErrorKind::FqnMissingValue => {
      (Code::InvalidArgument, FQN_MISSING_VALUE.into())
    }
    ErrorKind::Validation => (Code::InvalidArgument, err.to_string()),
    ErrorKind::NotNull | ErrorKind::Unknown => {
      (Code::Internal, fallback.to_owned())
    }
  };
  error!(error = %err, ?kind, ?code, "{fallback}");
  ApiError { code, message }
}

/// Shorthand for running a result's error through [`handle_error`].
pub trait OrStatus<T> {
  fn or_status(self, fallback: &'static str) -> Result<T, ApiError>;
}

impl<T, E> OrStatus<T> for Result<T, E>
where
  E: Classify + fmt::Display,
{
  fn or_status(self, fallback: &'static str) -> Result<T, ApiError> {
    self.map_err(|err| handle_error(&err, fallback))
  }
}

#[cfg(test)]
mod tests {
  use tenet_core::Error;

  use super::*;

  #[test]
  fn known_kinds_get_stable_messages() {
    let err = handle_error(&Error::UniqueConstraint("x".into()), CREATION_FAILED);
    assert_eq!(err, ApiError::new(Code::AlreadyExists, ALREADY_EXISTS));

    let err = handle_error(&Error::ForeignKey("x".into()), CREATION_FAILED);
    assert_eq!(err, ApiError::new(Code::InvalidArgument, RELATION_INVALID));

    let err = handle_error(&Error::NotFound("x".into()), RETRIEVAL_FAILED);
    assert_eq!(err, ApiError::new(Code::NotFound, NOT_FOUND));

    let err = handle_error(&Error::Restrict("x".into()), DELETION_FAILED);
    assert_eq!(err, ApiError::new(Code::InvalidArgument, RESTRICTED));
  }

  #[test]
  fn unknown_errors_surface_the_fallback() {
    let err = handle_error(&Error::Unknown("disk on fire".into()), UPDATE_FAILED);
    assert_eq!(err, ApiError::new(Code::Internal, UPDATE_FAILED));

    let err = handle_error(&Error::NotNull("name".into()), CREATION_FAILED);
    assert_eq!(err.code, Code::Internal);
  }

  #[test]
  fn validation_keeps_its_message() {
    let err = handle_error(&Error::Validation("name is required".into()), CREATION_FAILED);
    assert_eq!(err.code, Code::InvalidArgument);
    assert_eq!(err.message, "invalid input: name is required");
  }

  #[test]
  fn codes_map_to_http() {
    assert_eq!(Code::AlreadyExists.status(), StatusCode::CONFLICT);
    assert_eq!(Code::InvalidArgument.status(), StatusCode::BAD_REQUEST);
    assert_eq!(Code::NotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(Code::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
