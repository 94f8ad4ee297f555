//! Error types for `strand-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid handle: {0:?}")]
  InvalidHandle(String),

  #[error("unknown entity type: {0:?}")]
  UnknownEntityKind(String),

  #[error("unknown request state: {0:?}")]
  UnknownRequestState(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
