//! Retractions: tombstone instructions for previously delivered entities.
//!
//! A retraction is never persisted: it is applied and discarded.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  content::{Comment, StatusMessage},
  person::Person,
};

/// The entity types a retraction can target. The wire names are the
/// historic class names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
  StatusMessage,
  Comment,
  Person,
}

impl EntityKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::StatusMessage => "StatusMessage",
      Self::Comment => "Comment",
      Self::Person => "Person",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EntityKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "StatusMessage" => Ok(Self::StatusMessage),
      "Comment" => Ok(Self::Comment),
      "Person" => Ok(Self::Person),
      other => Err(Error::UnknownEntityKind(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retraction {
  pub target_kind: EntityKind,
  pub target_guid: String,
  /// Handle of the person claiming authorship of the target.
  pub author:      String,
}

/// An entity that can be withdrawn with a [`Retraction`].
pub trait Retractable {
  const KIND: EntityKind;

  fn guid(&self) -> &str;

  fn author_handle(&self) -> &str;
}

impl Retraction {
  pub fn for_entity<T: Retractable>(entity: &T) -> Self {
    Self {
      target_kind: T::KIND,
      target_guid: entity.guid().to_string(),
      author:      entity.author_handle().to_string(),
    }
  }
}

impl Retractable for StatusMessage {
  const KIND: EntityKind = EntityKind::StatusMessage;

  fn guid(&self) -> &str { &self.guid }

  fn author_handle(&self) -> &str { &self.author }
}

impl Retractable for Comment {
  const KIND: EntityKind = EntityKind::Comment;

  fn guid(&self) -> &str { &self.guid }

  fn author_handle(&self) -> &str { &self.author }
}

/// Retracting a person withdraws the relationship with them; only the person
/// themself may send it.
impl Retractable for Person {
  const KIND: EntityKind = EntityKind::Person;

  fn guid(&self) -> &str { &self.guid }

  fn author_handle(&self) -> &str { &self.handle }
}
