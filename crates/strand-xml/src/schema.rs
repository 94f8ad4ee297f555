//! Typed schemas: maps envelope fields onto [`Message`] variants and back.
//!
//! Each wire tag has a fixed field list. Unknown fields are ignored so newer
//! nodes can add fields without breaking older ones. String fields are taken
//! verbatim; only typed values (timestamps, dates, flags, entity types)
//! tolerate surrounding whitespace.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use strand_core::{
  content::{Comment, StatusMessage},
  message::{Message, MessageKind, ProfileMessage},
  person::Profile,
  request::Request,
  retraction::{EntityKind, Retraction},
};

use crate::{
  envelope::Envelope,
  error::{Error, Result},
};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Field access ────────────────────────────────────────────────────────────

struct Fields<'a> {
  envelope: &'a Envelope,
}

impl Fields<'_> {
  fn optional(&self, name: &str) -> Option<String> {
    self.envelope.get(name).map(str::to_owned)
  }

  fn required(&self, name: &str) -> Result<String> {
    self.optional(name).ok_or_else(|| Error::MissingField {
      tag:   self.envelope.tag.clone(),
      field: name.to_string(),
    })
  }

  fn optional_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
    self
      .envelope
      .get(name)
      .map(|raw| parse_timestamp(name, raw))
      .transpose()
  }

  fn required_timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(name, &self.required(name)?)
  }

  fn optional_date(&self, name: &str) -> Result<Option<NaiveDate>> {
    self
      .envelope
      .get(name)
      .map(str::trim)
      .filter(|raw| !raw.is_empty())
      .map(|raw| {
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| invalid(name, e))
      })
      .transpose()
  }

  fn optional_bool(&self, name: &str) -> Result<Option<bool>> {
    self
      .envelope
      .get(name)
      .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(name, format!("expected true or false, got {other:?}"))),
      })
      .transpose()
  }
}

fn invalid(field: &str, reason: impl ToString) -> Error {
  Error::InvalidField {
    field:  field.to_string(),
    reason: reason.to_string(),
  }
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw.trim())
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| invalid(field, e))
}

fn encode_timestamp(dt: &DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ─── Decoding ────────────────────────────────────────────────────────────────

impl TryFrom<&Envelope> for Message {
  type Error = Error;

  fn try_from(envelope: &Envelope) -> Result<Self> {
    let kind = MessageKind::from_tag(&envelope.tag)
      .ok_or_else(|| Error::UnknownType(envelope.tag.clone()))?;
    let f = Fields { envelope };

    Ok(match kind {
      MessageKind::StatusMessage => Message::StatusMessage(StatusMessage {
        guid:       f.required("guid")?,
        author:     f.required("diaspora_handle")?,
        message:    f.required("message")?,
        public:     f.optional_bool("public")?.unwrap_or(false),
        created_at: f.required_timestamp("created_at")?,
      }),
      MessageKind::Comment => Message::Comment(Comment {
        guid:       f.required("guid")?,
        author:     f.required("diaspora_handle")?,
        post_guid:  f.required("post_guid")?,
        text:       f.required("text")?,
        created_at: f.optional_timestamp("created_at")?,
      }),
      MessageKind::Retraction => {
        let target_kind = f
          .required("type")?
          .trim()
          .parse::<EntityKind>()
          .map_err(|e| invalid("type", e))?;
        Message::Retraction(Retraction {
          target_kind,
          target_guid: f.required("post_guid")?,
          author: f.required("diaspora_handle")?,
        })
      }
      MessageKind::Request => Message::Request(Request {
        guid:         f.required("guid")?,
        sender:       f.required("sender_handle")?,
        sender_guid:  f.optional("sender_guid"),
        recipient:    f.required("recipient_handle")?,
        callback_url: f.optional("callback_url"),
        exported_key: f.optional("exported_key"),
      }),
      MessageKind::Profile => Message::Profile(ProfileMessage {
        handle:  f.required("diaspora_handle")?,
        profile: Profile {
          first_name: f.optional("first_name"),
          last_name:  f.optional("last_name"),
          image_url:  f.optional("image_url"),
          bio:        f.optional("bio"),
          birthday:   f.optional_date("birthday")?,
          searchable: f.optional_bool("searchable")?.unwrap_or(true),
        },
      }),
    })
  }
}

// ─── Encoding ────────────────────────────────────────────────────────────────

fn push_opt(envelope: &mut Envelope, name: &str, value: Option<&String>) {
  if let Some(v) = value {
    envelope.push(name, v.as_str());
  }
}

impl From<&Message> for Envelope {
  fn from(message: &Message) -> Self {
    let mut env = Envelope::new(message.kind().tag());

    match message {
      Message::StatusMessage(m) => {
        env.push("guid", m.guid.as_str());
        env.push("diaspora_handle", m.author.as_str());
        env.push("message", m.message.as_str());
        env.push("public", m.public.to_string());
        env.push("created_at", encode_timestamp(&m.created_at));
      }
      Message::Comment(c) => {
        env.push("guid", c.guid.as_str());
        env.push("diaspora_handle", c.author.as_str());
        env.push("post_guid", c.post_guid.as_str());
        env.push("text", c.text.as_str());
        if let Some(at) = &c.created_at {
          env.push("created_at", encode_timestamp(at));
        }
      }
      Message::Retraction(r) => {
        env.push("post_guid", r.target_guid.as_str());
        env.push("type", r.target_kind.as_str());
        env.push("diaspora_handle", r.author.as_str());
      }
      Message::Request(r) => {
        env.push("guid", r.guid.as_str());
        env.push("sender_handle", r.sender.as_str());
        push_opt(&mut env, "sender_guid", r.sender_guid.as_ref());
        env.push("recipient_handle", r.recipient.as_str());
        push_opt(&mut env, "callback_url", r.callback_url.as_ref());
        push_opt(&mut env, "exported_key", r.exported_key.as_ref());
      }
      Message::Profile(p) => {
        env.push("diaspora_handle", p.handle.as_str());
        push_opt(&mut env, "first_name", p.profile.first_name.as_ref());
        push_opt(&mut env, "last_name", p.profile.last_name.as_ref());
        push_opt(&mut env, "image_url", p.profile.image_url.as_ref());
        push_opt(&mut env, "bio", p.profile.bio.as_ref());
        if let Some(birthday) = &p.profile.birthday {
          env.push("birthday", birthday.format(DATE_FORMAT).to_string());
        }
        env.push("searchable", p.profile.searchable.to_string());
      }
    }

    env
  }
}
