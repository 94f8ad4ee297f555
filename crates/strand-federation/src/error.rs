//! Error types for the receive pipeline and the local handshake operations.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("message of {size} bytes exceeds the {limit} byte limit")]
  Oversized { size: usize, limit: usize },

  #[error("unparseable message: {0}")]
  Parse(#[source] strand_xml::Error),

  #[error("unsupported message type: <{0}>")]
  UnsupportedType(String),

  #[error("<{tag}> is missing required field <{field}>")]
  MissingField { tag: String, field: String },

  #[error("invalid value in <{field}>: {reason}")]
  InvalidField { field: String, reason: String },

  #[error("claimed sender {claimed} does not match author {author}")]
  SenderMismatch { claimed: String, author: String },

  #[error("comment {comment} refers to unknown post {post}")]
  UnknownParent { comment: String, post: String },

  #[error("request addressed to {0}, not to this recipient")]
  Misaddressed(String),

  #[error("invalid profile: {0}")]
  InvalidProfile(String),

  #[error("no pending request {0}")]
  UnknownRequest(String),

  #[error("aspect {0} does not belong to this user")]
  UnknownAspect(Uuid),

  #[error(transparent)]
  Core(#[from] strand_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// Soft failures are logged and dropped; the sender should not retry.
  pub fn is_soft(&self) -> bool { matches!(self, Self::UnsupportedType(_)) }
}

impl From<strand_xml::Error> for Error {
  fn from(e: strand_xml::Error) -> Self {
    match e {
      strand_xml::Error::UnknownType(tag) => Self::UnsupportedType(tag),
      strand_xml::Error::MissingField { tag, field } => {
        Self::MissingField { tag, field }
      }
      strand_xml::Error::InvalidField { field, reason } => {
        Self::InvalidField { field, reason }
      }
      other => Self::Parse(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
