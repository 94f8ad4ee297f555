//! Aspects and contacts.
//!
//! An aspect is a named group of contacts owned by a local person, used to
//! scope sharing. A contact is an established relationship between a local
//! person and a remote one, and exists only once the handshake completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
  pub aspect_id:  Uuid,
  pub owner_id:   Uuid,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// At most one contact exists per (owner, person) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id: Uuid,
  pub owner_id:   Uuid,
  pub person_id:  Uuid,
  pub created_at: DateTime<Utc>,
}
