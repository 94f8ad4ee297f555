//! Person: a participant addressable by a globally unique handle.
//!
//! A person may be local (owns aspects and receives messages) or remote
//! (known only through the messages its node has sent us).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Normalise a handle of the form `local@host`.
///
/// Handles compare case-insensitively, so the stored form is lowercase.
pub fn normalize_handle(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let (local, host) = trimmed
    .split_once('@')
    .ok_or_else(|| Error::InvalidHandle(raw.to_string()))?;

  let valid_part = |s: &str| {
    !s.is_empty() && !s.contains('@') && !s.chars().any(char::is_whitespace)
  };
  if !valid_part(local) || !valid_part(host) {
    return Err(Error::InvalidHandle(raw.to_string()));
  }

  Ok(trimmed.to_lowercase())
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Descriptive attributes of a person. Always replaced as a whole unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub image_url:  Option<String>,
  pub bio:        Option<String>,
  pub birthday:   Option<NaiveDate>,
  /// Whether the person wants to appear in directory searches.
  pub searchable: bool,
}

impl Default for Profile {
  fn default() -> Self {
    Self {
      first_name: None,
      last_name:  None,
      image_url:  None,
      bio:        None,
      birthday:   None,
      searchable: true,
    }
  }
}

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  /// Local row identifier; never leaves this node.
  pub person_id:  Uuid,
  /// Federation-wide identifier, used as the target of person retractions.
  pub guid:       String,
  pub handle:     String,
  /// Exported public key material, if known.
  pub public_key: Option<String>,
  /// Origin of the person's home node, e.g. `https://pod.example/`.
  pub url:        Option<String>,
  pub profile:    Option<Profile>,
  pub created_at: DateTime<Utc>,
}

impl Person {
  /// The inbox URL other nodes deliver to for this person, if the home node
  /// is known.
  pub fn receive_url(&self) -> Option<String> {
    self.url.as_ref().map(|origin| {
      format!("{}/receive/users/{}", origin.trim_end_matches('/'), self.guid)
    })
  }
}

/// Input to [`crate::store::FederationStore::create_person`].
#[derive(Debug, Clone)]
pub struct NewPerson {
  pub handle:     String,
  /// Generated by the store when absent.
  pub guid:       Option<String>,
  pub public_key: Option<String>,
  pub url:        Option<String>,
}

impl NewPerson {
  pub fn new(handle: impl Into<String>) -> Self {
    Self {
      handle:     handle.into(),
      guid:       None,
      public_key: None,
      url:        None,
    }
  }
}

/// Parse `raw` as an absolute `http` or `https` URL with a host.
pub fn parse_web_url(raw: &str) -> Option<Url> {
  let url = Url::parse(raw).ok()?;
  let web = matches!(url.scheme(), "http" | "https") && url.host().is_some();
  web.then_some(url)
}

/// Derive a node origin (`scheme://host[:port]/`) from any URL on that node.
/// Credentials, path and query are dropped; default ports are omitted.
pub fn origin_of(url: &str) -> Option<String> {
  let origin = parse_web_url(url)?.origin();
  Some(format!("{}/", origin.ascii_serialization()))
}
