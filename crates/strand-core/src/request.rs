//! Handshake requests.
//!
//! A [`Request`] is the wire value: one direction of a handshake ("sender
//! wants to connect to recipient"). Each local participant keeps its own
//! [`StoredRequest`] record tracking where the handshake stands.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, person::Person};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
  /// Shared by the request and its reverse.
  pub guid:         String,
  pub sender:       String,
  pub sender_guid:  Option<String>,
  pub recipient:    String,
  /// Where the recipient can reach the sender's node.
  pub callback_url: Option<String>,
  pub exported_key: Option<String>,
}

impl Request {
  /// Start a handshake from `from` towards the person with handle `to`.
  pub fn instantiate(to: impl Into<String>, from: &Person) -> Self {
    Self {
      guid:         Uuid::new_v4().to_string(),
      sender:       from.handle.clone(),
      sender_guid:  Some(from.guid.clone()),
      recipient:    to.into(),
      callback_url: from.receive_url(),
      exported_key: from.public_key.clone(),
    }
  }

  /// The counter-request `accepting` sends back to the original sender.
  pub fn reverse_for(&self, accepting: &Person) -> Self {
    Self {
      guid:         self.guid.clone(),
      sender:       accepting.handle.clone(),
      sender_guid:  Some(accepting.guid.clone()),
      recipient:    self.sender.clone(),
      callback_url: accepting.receive_url(),
      exported_key: accepting.public_key.clone(),
    }
  }
}

// ─── Local tracking ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
  /// Waiting on the other side.
  Pending,
  /// An incoming request this node answered with a counter-request.
  Reversed,
  /// An outgoing request confirmed by the other side's counter-request.
  Accepted,
}

impl RequestState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Reversed => "reversed",
      Self::Accepted => "accepted",
    }
  }
}

impl fmt::Display for RequestState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for RequestState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "reversed" => Ok(Self::Reversed),
      "accepted" => Ok(Self::Accepted),
      other => Err(Error::UnknownRequestState(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
  Outgoing,
  Incoming,
}

/// A request as remembered by one local participant (`owner_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRequest {
  pub owner_id:   Uuid,
  pub request:    Request,
  pub direction:  RequestDirection,
  pub state:      RequestState,
  /// Aspect chosen by the initiator; the contact lands here on acceptance.
  pub aspect_id:  Option<Uuid>,
  pub created_at: DateTime<Utc>,
}
