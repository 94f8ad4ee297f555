//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use strand_federation::Error as Federation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("not found")]
  NotFound,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("payload too large")]
  PayloadTooLarge,
  #[error(transparent)]
  Federation(#[from] Federation),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::NotFound => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
      Error::Federation(e) => match e {
        Federation::Oversized { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        Federation::Parse(_) => StatusCode::BAD_REQUEST,
        Federation::UnsupportedType(_) => StatusCode::ACCEPTED,
        Federation::SenderMismatch { .. } => StatusCode::FORBIDDEN,
        Federation::MissingField { .. }
        | Federation::InvalidField { .. }
        | Federation::UnknownParent { .. }
        | Federation::Misaddressed(_)
        | Federation::InvalidProfile(_)
        | Federation::Core(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Federation::UnknownRequest(_) | Federation::UnknownAspect(_) => {
          StatusCode::NOT_FOUND
        }
        Federation::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, self.to_string()).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn soft_failures_are_accepted() {
    let err = Error::from(Federation::UnsupportedType("photo".into()));
    assert_eq!(err.status(), StatusCode::ACCEPTED);
  }

  #[test]
  fn forgery_is_forbidden() {
    let err = Error::from(Federation::SenderMismatch {
      claimed: "t@node2".into(),
      author:  "s@node1".into(),
    });
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
  }
}
