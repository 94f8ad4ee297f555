//! Outbound serialization of local events.

use strand_core::{
  message::{Message, ProfileMessage},
  person::Person,
  retraction::{Retractable, Retraction},
};

/// Serialize any local entity that maps onto a wire message.
pub fn serialize(entity: impl Into<Message>) -> strand_xml::Result<Vec<u8>> {
  strand_xml::encode(&entity.into())
}

/// Parse a document produced by [`serialize`] or by a remote node.
pub fn parse(xml: &[u8]) -> strand_xml::Result<Message> { strand_xml::decode(xml) }

/// The retraction announcing that `entity` was withdrawn.
pub fn retraction_of<T: Retractable>(entity: &T) -> strand_xml::Result<Vec<u8>> {
  serialize(Retraction::for_entity(entity))
}

/// The profile broadcast for a local person, if it has one.
pub fn profile_of(person: &Person) -> Option<strand_xml::Result<Vec<u8>>> {
  let profile = person.profile.clone()?;
  Some(serialize(ProfileMessage {
    handle: person.handle.clone(),
    profile,
  }))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use strand_core::{content::StatusMessage, person::Profile, retraction::EntityKind};
  use uuid::Uuid;

  use super::*;

  fn person() -> Person {
    Person {
      person_id:  Uuid::new_v4(),
      guid:       "guid-alice".into(),
      handle:     "alice@local.example".into(),
      public_key: None,
      url:        None,
      profile:    None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn post_retraction_names_post_and_author() {
    let post = StatusMessage {
      guid:       "P1".into(),
      author:     "alice@local.example".into(),
      message:    "hello".into(),
      public:     false,
      created_at: Utc::now(),
    };
    let Message::Retraction(r) = parse(&retraction_of(&post).unwrap()).unwrap() else {
      panic!("expected a retraction");
    };
    assert_eq!(r.target_kind, EntityKind::StatusMessage);
    assert_eq!(r.target_guid, "P1");
    assert_eq!(r.author, "alice@local.example");
  }

  #[test]
  fn person_retraction_targets_the_person_guid() {
    let xml = retraction_of(&person()).unwrap();
    let text = std::str::from_utf8(&xml).unwrap();
    assert!(text.contains("<type>Person</type>"), "{text}");
    assert!(text.contains("<post_guid>guid-alice</post_guid>"), "{text}");
  }

  #[test]
  fn profile_is_only_sent_when_present() {
    let mut alice = person();
    assert!(profile_of(&alice).is_none());

    alice.profile = Some(Profile {
      first_name: Some("Alice".into()),
      ..Profile::default()
    });
    let Message::Profile(p) = parse(&profile_of(&alice).unwrap().unwrap()).unwrap() else {
      panic!("expected a profile");
    };
    assert_eq!(p.handle, alice.handle);
    assert_eq!(Some(p.profile), alice.profile);
  }
}
