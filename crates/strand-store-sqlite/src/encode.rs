//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Profiles are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use strand_core::{
  aspect::{Aspect, Contact},
  content::{Comment, StatusMessage},
  person::{Person, Profile},
  request::{Request, RequestDirection, RequestState, StoredRequest},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

pub fn encode_profile(profile: Option<&Profile>) -> Result<Option<String>> {
  Ok(profile.map(serde_json::to_string).transpose()?)
}

// ─── RequestDirection ─────────────────────────────────────────────────────────

pub fn encode_direction(d: RequestDirection) -> &'static str {
  match d {
    RequestDirection::Outgoing => "outgoing",
    RequestDirection::Incoming => "incoming",
  }
}

pub fn decode_direction(s: &str) -> Result<RequestDirection> {
  match s {
    "outgoing" => Ok(RequestDirection::Outgoing),
    "incoming" => Ok(RequestDirection::Incoming),
    other => Err(Error::UnknownDirection(other.to_string())),
  }
}

// ─── Raw row types ───────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str =
  "person_id, guid, handle, public_key, url, profile_json, created_at";

pub struct RawPerson {
  pub person_id:    String,
  pub guid:         String,
  pub handle:       String,
  pub public_key:   Option<String>,
  pub url:          Option<String>,
  pub profile_json: Option<String>,
  pub created_at:   String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:    row.get(0)?,
      guid:         row.get(1)?,
      handle:       row.get(2)?,
      public_key:   row.get(3)?,
      url:          row.get(4)?,
      profile_json: row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let profile = self
      .profile_json
      .as_deref()
      .map(serde_json::from_str::<Profile>)
      .transpose()?;

    Ok(Person {
      person_id: decode_uuid(&self.person_id)?,
      guid: self.guid,
      handle: self.handle,
      public_key: self.public_key,
      url: self.url,
      profile,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAspect {
  pub aspect_id:  String,
  pub owner_id:   String,
  pub name:       String,
  pub created_at: String,
}

impl RawAspect {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      aspect_id:  row.get(0)?,
      owner_id:   row.get(1)?,
      name:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_aspect(self) -> Result<Aspect> {
    Ok(Aspect {
      aspect_id:  decode_uuid(&self.aspect_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawContact {
  pub contact_id: String,
  pub owner_id:   String,
  pub person_id:  String,
  pub created_at: String,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id: row.get(0)?,
      owner_id:   row.get(1)?,
      person_id:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id: decode_uuid(&self.contact_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      person_id:  decode_uuid(&self.person_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawStatusMessage {
  pub guid:       String,
  pub author:     String,
  pub message:    String,
  pub public:     bool,
  pub created_at: String,
}

impl RawStatusMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      guid:       row.get(0)?,
      author:     row.get(1)?,
      message:    row.get(2)?,
      public:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_status_message(self) -> Result<StatusMessage> {
    Ok(StatusMessage {
      guid:       self.guid,
      author:     self.author,
      message:    self.message,
      public:     self.public,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawComment {
  pub guid:       String,
  pub post_guid:  String,
  pub author:     String,
  pub text:       String,
  pub created_at: Option<String>,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      guid:       row.get(0)?,
      post_guid:  row.get(1)?,
      author:     row.get(2)?,
      text:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      guid:       self.guid,
      author:     self.author,
      post_guid:  self.post_guid,
      text:       self.text,
      created_at: self.created_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const REQUEST_COLUMNS: &str = "owner_id, guid, sender, sender_guid, recipient, \
   callback_url, exported_key, direction, state, aspect_id, created_at";

pub struct RawRequest {
  pub owner_id:     String,
  pub guid:         String,
  pub sender:       String,
  pub sender_guid:  Option<String>,
  pub recipient:    String,
  pub callback_url: Option<String>,
  pub exported_key: Option<String>,
  pub direction:    String,
  pub state:        String,
  pub aspect_id:    Option<String>,
  pub created_at:   String,
}

impl RawRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner_id:     row.get(0)?,
      guid:         row.get(1)?,
      sender:       row.get(2)?,
      sender_guid:  row.get(3)?,
      recipient:    row.get(4)?,
      callback_url: row.get(5)?,
      exported_key: row.get(6)?,
      direction:    row.get(7)?,
      state:        row.get(8)?,
      aspect_id:    row.get(9)?,
      created_at:   row.get(10)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredRequest> {
    Ok(StoredRequest {
      owner_id:   decode_uuid(&self.owner_id)?,
      request:    Request {
        guid:         self.guid,
        sender:       self.sender,
        sender_guid:  self.sender_guid,
        recipient:    self.recipient,
        callback_url: self.callback_url,
        exported_key: self.exported_key,
      },
      direction:  decode_direction(&self.direction)?,
      state:      self.state.parse::<RequestState>()?,
      aspect_id:  self.aspect_id.as_deref().map(decode_uuid).transpose()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
