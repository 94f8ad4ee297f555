//! XML envelope codec for the Strand federation protocol.
//!
//! Converts between wire documents and [`strand_core`] message types. Pure
//! synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use strand_core::message::Message;
//!
//! let xml = b"<retraction><post_guid>p1</post_guid><type>StatusMessage</type>\
//!             <diaspora_handle>s@node1</diaspora_handle></retraction>";
//! let message: Message = strand_xml::decode(xml).unwrap();
//! let bytes = strand_xml::encode(&message).unwrap();
//! assert_eq!(strand_xml::decode(&bytes).unwrap(), message);
//! ```

pub mod envelope;
pub mod error;
mod schema;

pub use envelope::{Envelope, decode_envelope, encode_envelope};
pub use error::{Error, Result};
use strand_core::message::Message;

/// Decode one wire document into a typed [`Message`].
pub fn decode(xml: &[u8]) -> Result<Message> {
  let envelope = decode_envelope(xml)?;
  Message::try_from(&envelope)
}

/// Encode a [`Message`]; [`decode`] maps the output back to an equal value.
pub fn encode(message: &Message) -> Result<Vec<u8>> {
  encode_envelope(&Envelope::from(message))
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, TimeZone, Utc};
  use strand_core::{
    content::{Comment, StatusMessage},
    message::ProfileMessage,
    person::Profile,
    request::Request,
    retraction::{EntityKind, Retraction},
  };

  use super::*;

  fn round_trip(message: Message) {
    let bytes = encode(&message).unwrap();
    assert_eq!(decode(&bytes).unwrap(), message);
  }

  #[test]
  fn status_message_round_trips_with_subsecond_timestamp() {
    round_trip(Message::StatusMessage(StatusMessage {
      guid:       "p1".into(),
      author:     "s@node1".into(),
      message:    "hello <world> & friends".into(),
      public:     true,
      created_at: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(),
    }));
  }

  #[test]
  fn comment_round_trips_with_and_without_timestamp() {
    let comment = Comment {
      guid:       "c1".into(),
      author:     "s@node1".into(),
      post_guid:  "P1".into(),
      text:       "Freedom!".into(),
      created_at: None,
    };
    round_trip(Message::Comment(comment.clone()));
    round_trip(Message::Comment(Comment {
      created_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
      ..comment
    }));
  }

  #[test]
  fn retraction_and_request_round_trip() {
    round_trip(Message::Retraction(Retraction {
      target_kind: EntityKind::Person,
      target_guid: "guid-1".into(),
      author:      "s@node1".into(),
    }));
    round_trip(Message::Request(Request {
      guid:         "r1".into(),
      sender:       "a@node1".into(),
      sender_guid:  Some("guid-a".into()),
      recipient:    "b@node2".into(),
      callback_url: Some("https://node1/receive/users/guid-a".into()),
      exported_key: None,
    }));
  }

  #[test]
  fn profile_round_trips_including_empty_values() {
    round_trip(Message::Profile(ProfileMessage {
      handle:  "s@node1".into(),
      profile: Profile {
        first_name: Some("bob".into()),
        last_name:  Some("billytown".into()),
        image_url:  Some("http://clown.com".into()),
        bio:        Some(String::new()),
        birthday:   NaiveDate::from_ymd_opt(1990, 2, 28),
        searchable: false,
      },
    }));
  }

  /// Text that a lossy codec would rewrite: edge whitespace, newlines,
  /// markup, entities and CDATA terminators.
  const AWKWARD: [&str; 6] = [
    "    indented code\n",
    "\n\ttabbed\n\n",
    " ",
    "<b>bold</b> &amp; ]]> done",
    "quote \" and apostrophe '",
    "ünïcödé \u{1F980}",
  ];

  #[test]
  fn awkward_text_round_trips_in_every_message_type() {
    for text in AWKWARD {
      round_trip(Message::StatusMessage(StatusMessage {
        guid:       "p1".into(),
        author:     "s@node1".into(),
        message:    text.into(),
        public:     false,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
      }));
      round_trip(Message::Comment(Comment {
        guid:       "c1".into(),
        author:     "s@node1".into(),
        post_guid:  "p1".into(),
        text:       text.into(),
        created_at: None,
      }));
      round_trip(Message::Retraction(Retraction {
        target_kind: EntityKind::StatusMessage,
        target_guid: text.into(),
        author:      "s@node1".into(),
      }));
      round_trip(Message::Request(Request {
        guid:         "r1".into(),
        sender:       "a@node1".into(),
        sender_guid:  Some(text.into()),
        recipient:    "b@node2".into(),
        callback_url: None,
        exported_key: Some(format!("-----BEGIN KEY-----\n{text}\n-----END KEY-----\n")),
      }));
      round_trip(Message::Profile(ProfileMessage {
        handle:  "s@node1".into(),
        profile: Profile {
          first_name: Some(text.into()),
          last_name:  None,
          image_url:  None,
          bio:        Some(format!("{text}\n\nsecond paragraph\n")),
          birthday:   None,
          searchable: true,
        },
      }));
    }
  }

  #[test]
  fn typed_values_tolerate_surrounding_whitespace() {
    let xml = b"<status_message>\n  <guid>p1</guid>\n  <diaspora_handle>s@node1</diaspora_handle>\n  \
                <message> hi </message>\n  <public>\n true\n </public>\n  \
                <created_at> 2024-01-01T00:00:00Z </created_at>\n</status_message>";
    let Message::StatusMessage(post) = decode(xml).unwrap() else {
      panic!("expected a status message");
    };
    assert!(post.public);
    assert_eq!(post.message, " hi ");
    assert_eq!(post.created_at, Utc.timestamp_opt(1_704_067_200, 0).unwrap());
  }

  #[test]
  fn comment_fields_are_read_from_legacy_document() {
    let xml = br#"<XML>
      <post>
        <comment>
          <guid>c1</guid>
          <post_guid>P1</post_guid>
          <text>Freedom!</text>
          <diaspora_handle>s@node1</diaspora_handle>
          <creator_signature>ignored</creator_signature>
        </comment>
      </post>
    </XML>"#;
    let Message::Comment(comment) = decode(xml).unwrap() else {
      panic!("expected a comment");
    };
    assert_eq!(comment.author, "s@node1");
    assert_eq!(comment.post_guid, "P1");
    assert_eq!(comment.text, "Freedom!");
  }

  #[test]
  fn missing_required_field_is_reported() {
    let xml = b"<comment><guid>c1</guid><text>hi</text><diaspora_handle>s@node1</diaspora_handle></comment>";
    match decode(xml) {
      Err(Error::MissingField { tag, field }) => {
        assert_eq!(tag, "comment");
        assert_eq!(field, "post_guid");
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn unknown_tag_and_bad_values_are_distinguished() {
    assert!(matches!(
      decode(b"<photo><guid>x</guid></photo>"),
      Err(Error::UnknownType(tag)) if tag == "photo"
    ));
    let bad_type = b"<retraction><post_guid>x</post_guid><type>Album</type>\
                     <diaspora_handle>s@node1</diaspora_handle></retraction>";
    assert!(matches!(decode(bad_type), Err(Error::InvalidField { field, .. }) if field == "type"));
    let bad_date = b"<profile><diaspora_handle>s@node1</diaspora_handle>\
                     <birthday>yesterday</birthday></profile>";
    assert!(matches!(decode(bad_date), Err(Error::InvalidField { field, .. }) if field == "birthday"));
  }
}
