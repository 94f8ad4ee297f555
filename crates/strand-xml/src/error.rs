//! Error types for the strand-xml codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("empty document")]
  Empty,

  #[error("malformed xml: {0}")]
  Malformed(String),

  #[error("unknown message type: <{0}>")]
  UnknownType(String),

  #[error("<{tag}> is missing required field <{field}>")]
  MissingField { tag: String, field: String },

  #[error("invalid value in <{field}>: {reason}")]
  InvalidField { field: String, reason: String },

  #[error("write error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
