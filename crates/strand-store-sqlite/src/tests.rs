//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, Utc};
use strand_core::{
  content::{Comment, StatusMessage},
  person::{NewPerson, Profile},
  request::{Request, RequestDirection, RequestState, StoredRequest},
  store::FederationStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn post(guid: &str, author: &str) -> StatusMessage {
  StatusMessage {
    guid:       guid.into(),
    author:     author.into(),
    message:    "hello".into(),
    public:     false,
    created_at: Utc::now(),
  }
}

fn comment(guid: &str, post_guid: &str) -> Comment {
  Comment {
    guid:       guid.into(),
    author:     "s@node1".into(),
    post_guid:  post_guid.into(),
    text:       "Freedom!".into(),
    created_at: None,
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_person_and_find_by_handle_and_guid() {
  let s = store().await;

  let mut input = NewPerson::new("alice@one.example");
  input.guid = Some("guid-alice".into());
  input.public_key = Some("KEY".into());
  let alice = s.create_person(input).await.unwrap();

  let by_handle = s.find_person_by_handle("alice@one.example").await.unwrap();
  assert_eq!(by_handle.as_ref(), Some(&alice));
  let by_guid = s.find_person_by_guid("guid-alice").await.unwrap();
  assert_eq!(by_guid.map(|p| p.person_id), Some(alice.person_id));
  assert_eq!(alice.public_key.as_deref(), Some("KEY"));
}

#[tokio::test]
async fn create_person_keeps_existing_row_for_duplicate_handle() {
  let s = store().await;

  let first = s.create_person(NewPerson::new("bob@two.example")).await.unwrap();
  let mut again = NewPerson::new("bob@two.example");
  again.public_key = Some("OTHER".into());
  let second = s.create_person(again).await.unwrap();

  assert_eq!(first.person_id, second.person_id);
  assert_eq!(second.public_key, None);
}

#[tokio::test]
async fn taken_guid_is_not_reused() {
  let s = store().await;

  let mut mallory = NewPerson::new("mallory@evil.example");
  mallory.guid = Some("guid-bob".into());
  let mallory = s.create_person(mallory).await.unwrap();
  assert_eq!(mallory.guid, "guid-bob");

  let mut bob = NewPerson::new("bob@two.example");
  bob.guid = Some("guid-bob".into());
  let bob = s.create_person(bob).await.unwrap();
  assert_ne!(bob.guid, "guid-bob");
  assert_ne!(bob.person_id, mallory.person_id);
  let holder = s.find_person_by_guid("guid-bob").await.unwrap().unwrap();
  assert_eq!(holder.person_id, mallory.person_id);
}

#[tokio::test]
async fn update_identity_replaces_only_generated_guids() {
  let s = store().await;

  let placeholder = s.create_person(NewPerson::new("bob@two.example")).await.unwrap();
  let mut remote = NewPerson::new("carol@three.example");
  remote.guid = Some("guid-carol".into());
  remote.url = Some("https://three.example/".into());
  let carol = s.create_person(remote).await.unwrap();

  let bob = s
    .update_identity(
      placeholder.person_id,
      Some("guid-bob".into()),
      Some("KEY".into()),
      Some("https://two.example/".into()),
    )
    .await
    .unwrap()
    .unwrap();
  assert_eq!(bob.guid, "guid-bob");
  assert_eq!(bob.public_key.as_deref(), Some("KEY"));
  assert_eq!(bob.url.as_deref(), Some("https://two.example/"));

  // a guid learned from the remote side is final
  let bob = s
    .update_identity(bob.person_id, Some("guid-other".into()), Some("NEW".into()), None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(bob.guid, "guid-bob");
  assert_eq!(bob.public_key.as_deref(), Some("KEY"));

  let carol = s
    .update_identity(carol.person_id, Some("guid-carol-2".into()), None, None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(carol.guid, "guid-carol");
  assert_eq!(carol.url.as_deref(), Some("https://three.example/"));

  assert!(
    s.update_identity(Uuid::new_v4(), None, None, None)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn update_identity_skips_a_taken_guid() {
  let s = store().await;
  let mut mallory = NewPerson::new("mallory@evil.example");
  mallory.guid = Some("guid-bob".into());
  s.create_person(mallory).await.unwrap();
  let placeholder = s.create_person(NewPerson::new("bob@two.example")).await.unwrap();

  let bob = s
    .update_identity(placeholder.person_id, Some("guid-bob".into()), None, None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(bob.guid, placeholder.guid);
}

#[tokio::test]
async fn replace_profile_swaps_whole_value() {
  let s = store().await;
  let p = s.create_person(NewPerson::new("carol@three.example")).await.unwrap();
  assert!(p.profile.is_none());

  let profile = Profile {
    first_name: Some("bob".into()),
    last_name:  Some("billytown".into()),
    image_url:  Some("http://clown.com".into()),
    birthday:   NaiveDate::from_ymd_opt(1984, 1, 1),
    ..Profile::default()
  };
  assert!(s.replace_profile(p.person_id, Some(profile.clone())).await.unwrap());

  let reloaded = s.get_person(p.person_id).await.unwrap().unwrap();
  assert_eq!(reloaded.profile, Some(profile));

  assert!(s.replace_profile(p.person_id, None).await.unwrap());
  let cleared = s.get_person(p.person_id).await.unwrap().unwrap();
  assert_eq!(cleared.profile, None);

  assert!(!s.replace_profile(Uuid::new_v4(), None).await.unwrap());
}

#[tokio::test]
async fn delete_person_removes_their_contacts() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let friend = s.create_person(NewPerson::new("friend@remote")).await.unwrap();
  s.create_contact(owner.person_id, friend.person_id).await.unwrap();

  assert!(s.delete_person(friend.person_id).await.unwrap());
  assert!(s.list_contacts(owner.person_id).await.unwrap().is_empty());
  assert!(!s.delete_person(friend.person_id).await.unwrap());
}

// ─── Aspects and contacts ────────────────────────────────────────────────────

#[tokio::test]
async fn contacts_are_unique_per_pair() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let friend = s.create_person(NewPerson::new("friend@remote")).await.unwrap();

  let a = s.create_contact(owner.person_id, friend.person_id).await.unwrap();
  let b = s.create_contact(owner.person_id, friend.person_id).await.unwrap();
  assert_eq!(a.contact_id, b.contact_id);
  assert_eq!(s.list_contacts(owner.person_id).await.unwrap().len(), 1);

  let found = s.find_contact(owner.person_id, friend.person_id).await.unwrap();
  assert_eq!(found, Some(a));
}

#[tokio::test]
async fn membership_is_a_set_and_removal_spans_every_aspect() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let friend = s.create_person(NewPerson::new("friend@remote")).await.unwrap();
  let spies = s.create_aspect(owner.person_id, "spies".into()).await.unwrap();
  let pandas = s.create_aspect(owner.person_id, "pandas".into()).await.unwrap();
  let contact = s.create_contact(owner.person_id, friend.person_id).await.unwrap();

  assert!(s.add_to_aspect(spies.aspect_id, contact.contact_id).await.unwrap());
  assert!(!s.add_to_aspect(spies.aspect_id, contact.contact_id).await.unwrap());
  assert!(s.add_to_aspect(pandas.aspect_id, contact.contact_id).await.unwrap());
  assert_eq!(s.aspect_members(spies.aspect_id).await.unwrap().len(), 1);
  let mut expected = vec![spies.aspect_id, pandas.aspect_id];
  expected.sort();
  assert_eq!(s.contact_aspects(contact.contact_id).await.unwrap(), expected);

  let mut shrunk = s.remove_from_all_aspects(contact.contact_id).await.unwrap();
  shrunk.sort();
  assert_eq!(shrunk, expected);
  assert!(s.contact_aspects(contact.contact_id).await.unwrap().is_empty());
  assert!(s.aspect_members(spies.aspect_id).await.unwrap().is_empty());
  assert!(s.aspect_members(pandas.aspect_id).await.unwrap().is_empty());

  let names: Vec<_> = s
    .list_aspects(owner.person_id)
    .await
    .unwrap()
    .into_iter()
    .map(|a| a.name)
    .collect();
  assert_eq!(names, vec!["spies", "pandas"]);
  assert_eq!(s.get_aspect(spies.aspect_id).await.unwrap(), Some(spies));
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_is_idempotent_by_guid() {
  let s = store().await;
  assert!(s.insert_status_message(post("P1", "s@node1"), vec![]).await.unwrap());
  assert!(!s.insert_status_message(post("P1", "s@node1"), vec![]).await.unwrap());

  assert!(s.insert_comment(comment("C1", "P1")).await.unwrap());
  assert!(!s.insert_comment(comment("C1", "P1")).await.unwrap());
  assert_eq!(s.comments_for("P1").await.unwrap().len(), 1);
  assert_eq!(s.find_comment("C1").await.unwrap(), Some(comment("C1", "P1")));
}

#[tokio::test]
async fn deleting_a_post_cascades_to_comments_and_visibility() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let aspect = s.create_aspect(owner.person_id, "spies".into()).await.unwrap();

  let shared = s
    .insert_status_message(post("P1", "s@node1"), vec![aspect.aspect_id])
    .await
    .unwrap();
  assert!(shared);
  s.insert_comment(comment("C1", "P1")).await.unwrap();
  assert_eq!(s.post_aspects("P1").await.unwrap(), vec![aspect.aspect_id]);

  assert!(s.delete_status_message("P1").await.unwrap());
  assert!(s.find_status_message("P1").await.unwrap().is_none());
  assert!(s.find_comment("C1").await.unwrap().is_none());
  assert!(s.post_aspects("P1").await.unwrap().is_empty());
  assert!(!s.delete_status_message("P1").await.unwrap());
}

#[tokio::test]
async fn rejected_share_leaves_no_post_behind() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let spies = s.create_aspect(owner.person_id, "spies".into()).await.unwrap();

  // the visibility row violates its foreign key, so the post goes too
  let missing = Uuid::new_v4();
  let result = s
    .insert_status_message(post("P1", "s@node1"), vec![spies.aspect_id, missing])
    .await;
  assert!(result.is_err());
  assert!(s.find_status_message("P1").await.unwrap().is_none());
  assert!(s.post_aspects("P1").await.unwrap().is_empty());

  let retried = s
    .insert_status_message(post("P1", "s@node1"), vec![spies.aspect_id])
    .await
    .unwrap();
  assert!(retried);
  assert_eq!(s.post_aspects("P1").await.unwrap(), vec![spies.aspect_id]);
}

#[tokio::test]
async fn posts_by_author_and_unshare() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let aspect = s.create_aspect(owner.person_id, "spies".into()).await.unwrap();

  s.insert_status_message(post("P1", "s@node1"), vec![aspect.aspect_id])
    .await
    .unwrap();
  s.insert_status_message(post("P2", "t@node2"), vec![]).await.unwrap();
  let by_s = s.posts_by_author("s@node1").await.unwrap();
  assert_eq!(by_s.len(), 1);
  assert_eq!(by_s[0].guid, "P1");

  assert!(s.unshare_post(aspect.aspect_id, "P1".into()).await.unwrap());
  assert!(!s.unshare_post(aspect.aspect_id, "P1".into()).await.unwrap());
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn request_lifecycle() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();
  let aspect = s.create_aspect(owner.person_id, "spies".into()).await.unwrap();

  let stored = StoredRequest {
    owner_id:   owner.person_id,
    request:    Request {
      guid:         "R1".into(),
      sender:       "friend@remote".into(),
      sender_guid:  None,
      recipient:    "owner@local".into(),
      callback_url: Some("https://remote/receive/users/x".into()),
      exported_key: Some("KEY".into()),
    },
    direction:  RequestDirection::Incoming,
    state:      RequestState::Pending,
    aspect_id:  Some(aspect.aspect_id),
    created_at: Utc::now(),
  };

  assert!(s.insert_request(stored.clone()).await.unwrap());
  assert!(!s.insert_request(stored.clone()).await.unwrap());

  let found = s.find_request(owner.person_id, "R1").await.unwrap().unwrap();
  assert_eq!(found.request, stored.request);
  assert_eq!(found.aspect_id, Some(aspect.aspect_id));
  assert_eq!(s.pending_requests(owner.person_id).await.unwrap().len(), 1);

  assert!(s.set_request_state(owner.person_id, "R1", RequestState::Reversed).await.unwrap());
  assert!(s.pending_requests(owner.person_id).await.unwrap().is_empty());
  let found = s.find_request(owner.person_id, "R1").await.unwrap().unwrap();
  assert_eq!(found.state, RequestState::Reversed);

  assert!(s.delete_request(owner.person_id, "R1").await.unwrap());
  assert!(s.find_request(owner.person_id, "R1").await.unwrap().is_none());
}

#[tokio::test]
async fn pending_outgoing_request_is_found_by_recipient() {
  let s = store().await;
  let owner = s.create_person(NewPerson::new("owner@local")).await.unwrap();

  let outgoing = StoredRequest {
    owner_id:   owner.person_id,
    request:    Request {
      guid:         "R1".into(),
      sender:       "owner@local".into(),
      sender_guid:  Some(owner.guid.clone()),
      recipient:    "friend@remote".into(),
      callback_url: None,
      exported_key: None,
    },
    direction:  RequestDirection::Outgoing,
    state:      RequestState::Pending,
    aspect_id:  None,
    created_at: Utc::now(),
  };
  s.insert_request(outgoing.clone()).await.unwrap();

  let found = s
    .pending_outgoing_to(owner.person_id, "friend@remote")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.request, outgoing.request);
  assert_eq!(found.direction, RequestDirection::Outgoing);
  assert!(s.pending_outgoing_to(owner.person_id, "other@remote").await.unwrap().is_none());
  // outgoing requests never show up as waiting for a decision
  assert!(s.pending_requests(owner.person_id).await.unwrap().is_empty());

  s.set_request_state(owner.person_id, "R1", RequestState::Accepted).await.unwrap();
  assert!(s.pending_outgoing_to(owner.person_id, "friend@remote").await.unwrap().is_none());
}
