//! Federation messages: the typed values carried by one wire envelope.
//!
//! [`Message`] is a sum type over every schema the protocol knows. The
//! mapping between wire tag names and schemas is explicit data:
//! [`MessageKind::tag`] and [`MessageKind::from_tag`].

use serde::{Deserialize, Serialize};

use crate::{
  content::{Comment, StatusMessage},
  person::Profile,
  request::Request,
  retraction::Retraction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  StatusMessage,
  Comment,
  Retraction,
  Request,
  Profile,
}

impl MessageKind {
  pub const ALL: [MessageKind; 5] = [
    Self::StatusMessage,
    Self::Comment,
    Self::Retraction,
    Self::Request,
    Self::Profile,
  ];

  /// The root element name on the wire.
  pub fn tag(self) -> &'static str {
    match self {
      Self::StatusMessage => "status_message",
      Self::Comment => "comment",
      Self::Retraction => "retraction",
      Self::Request => "request",
      Self::Profile => "profile",
    }
  }

  pub fn from_tag(tag: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.tag() == tag)
  }
}

/// A complete replacement profile for the person with `handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMessage {
  pub handle:  String,
  pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
  StatusMessage(StatusMessage),
  Comment(Comment),
  Retraction(Retraction),
  Request(Request),
  Profile(ProfileMessage),
}

impl Message {
  pub fn kind(&self) -> MessageKind {
    match self {
      Self::StatusMessage(_) => MessageKind::StatusMessage,
      Self::Comment(_) => MessageKind::Comment,
      Self::Retraction(_) => MessageKind::Retraction,
      Self::Request(_) => MessageKind::Request,
      Self::Profile(_) => MessageKind::Profile,
    }
  }

  /// The author handle embedded in the payload, checked against the claimed
  /// sender when a handler requires authorization binding.
  pub fn author_handle(&self) -> &str {
    match self {
      Self::StatusMessage(m) => &m.author,
      Self::Comment(c) => &c.author,
      Self::Retraction(r) => &r.author,
      Self::Request(r) => &r.sender,
      Self::Profile(p) => &p.handle,
    }
  }
}

impl From<StatusMessage> for Message {
  fn from(value: StatusMessage) -> Self { Self::StatusMessage(value) }
}

impl From<Comment> for Message {
  fn from(value: Comment) -> Self { Self::Comment(value) }
}

impl From<Retraction> for Message {
  fn from(value: Retraction) -> Self { Self::Retraction(value) }
}

impl From<Request> for Message {
  fn from(value: Request) -> Self { Self::Request(value) }
}

impl From<ProfileMessage> for Message {
  fn from(value: ProfileMessage) -> Self { Self::Profile(value) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_kind_maps_back_from_its_tag() {
    for kind in MessageKind::ALL {
      assert_eq!(MessageKind::from_tag(kind.tag()), Some(kind));
    }
    assert_eq!(MessageKind::from_tag("photo"), None);
  }
}
