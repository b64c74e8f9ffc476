//! Errors surfaced by the HTTP boundary.

use std::collections::BTreeMap;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
  /// The request never got a response
  #[error("Network error. Please check your connection.")]
  Network(#[source] reqwest::Error),

  /// 401: stored credentials were cleared
  #[error("Session expired. Please login again.")]
  SessionExpired,

  /// 422 with per-field messages
  #[error("{message}")]
  Validation {
    message: String,
    errors: BTreeMap<String, Vec<String>>,
  },

  #[error("Not found")]
  NotFound,

  /// 5xx
  #[error("Server error. Please try again later.")]
  Server { status: u16 },

  /// Any other non-success status, or `success: false` in the envelope
  #[error("Request failed ({status}): {message}")]
  Status { status: u16, message: String },

  #[error("Unexpected response: {0}")]
  Decode(String),

  /// No token stored and none supplied
  #[error("Not logged in")]
  Unauthenticated,
}

impl ApiError {
  /// First message for a form field, if this is a validation error.
  pub fn field_error(&self, field: &str) -> Option<&str> {
    match self {
      ApiError::Validation { errors, .. } => errors
        .get(field)
        .and_then(|messages| messages.first())
        .map(String::as_str),
      _ => None,
    }
  }

  /// Whether the user has to log in again.
  pub fn is_auth(&self) -> bool {
    matches!(self, ApiError::SessionExpired | ApiError::Unauthenticated)
  }
}
