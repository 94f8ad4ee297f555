//! Message type registry.
//!
//! A fixed table from wire tag to the handler contract for that message type.
//! Built on first use and never modified afterwards.

use std::{collections::HashMap, sync::LazyLock};

use strand_core::message::{Message, MessageKind};

use crate::{Error, Result};

/// How a message type is keyed for idempotence and locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
  /// Content entities: keyed by their own guid.
  Guid,
  /// Requests: keyed by the unordered pair of handles, so a request and its
  /// reverse serialise against each other.
  HandshakePair,
  /// Retractions: keyed by target type and target guid.
  Target,
  /// Profiles: keyed by the owning handle.
  Owner,
}

#[derive(Debug, Clone, Copy)]
pub struct HandlerSpec {
  pub kind:                    MessageKind,
  /// The claimed sender must equal the handle embedded in the payload.
  pub requires_author_binding: bool,
  pub dedup:                   DedupStrategy,
}

static REGISTRY: LazyLock<HashMap<&'static str, HandlerSpec>> =
  LazyLock::new(|| {
    MessageKind::ALL
      .into_iter()
      .map(|kind| (kind.tag(), spec_for(kind)))
      .collect()
  });

fn spec_for(kind: MessageKind) -> HandlerSpec {
  HandlerSpec {
    kind,
    requires_author_binding: true,
    dedup: DedupStrategy::of(kind),
  }
}

/// Look up the handler contract for a wire tag.
pub fn resolve(tag: &str) -> Result<&'static HandlerSpec> {
  REGISTRY
    .get(tag)
    .ok_or_else(|| Error::UnsupportedType(tag.to_string()))
}

/// Lock key shared by both directions of a handshake between two handles.
pub fn handshake_key(a: &str, b: &str) -> String {
  let (a, b) = (a.to_lowercase(), b.to_lowercase());
  if a <= b {
    format!("request:{a}|{b}")
  } else {
    format!("request:{b}|{a}")
  }
}

impl DedupStrategy {
  pub fn of(kind: MessageKind) -> Self {
    match kind {
      MessageKind::StatusMessage | MessageKind::Comment => Self::Guid,
      MessageKind::Request => Self::HandshakePair,
      MessageKind::Retraction => Self::Target,
      MessageKind::Profile => Self::Owner,
    }
  }
}

/// The idempotence and lock key of `message`. Each arm implements the
/// [`DedupStrategy`] its kind is registered with.
pub fn dedup_key(message: &Message) -> String {
  match message {
    Message::StatusMessage(m) => format!("status_message:{}", m.guid),
    Message::Comment(c) => format!("comment:{}", c.guid),
    Message::Request(r) => handshake_key(&r.sender, &r.recipient),
    Message::Retraction(r) => {
      format!("retraction:{}:{}", r.target_kind, r.target_guid)
    }
    Message::Profile(p) => format!("profile:{}", p.handle.to_lowercase()),
  }
}
