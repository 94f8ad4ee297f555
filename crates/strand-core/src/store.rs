//! The `FederationStore` trait: the persistence collaborator of the protocol
//! core.
//!
//! The trait is implemented by storage backends (e.g. `strand-store-sqlite`).
//! Higher layers (`strand-federation`, `strand-inbox`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  aspect::{Aspect, Contact},
  content::{Comment, StatusMessage},
  person::{NewPerson, Person, Profile},
  request::{RequestState, StoredRequest},
};

/// Abstraction over a Strand storage backend.
///
/// Every method that mutates more than one row is atomic: callers never
/// observe a partially applied change.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FederationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  fn find_person_by_handle<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn find_person_by_guid<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn get_person(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Persist a new person.
  ///
  /// Handles are unique: if a person with the same handle already exists,
  /// that row is returned unchanged and nothing is inserted. Guids are unique
  /// too: a requested guid already held by someone else is not reused, and
  /// the store generates one instead.
  fn create_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Record identity details learned after the person was first stored.
  ///
  /// `guid` replaces the current guid only if the store generated that one
  /// itself and no other person holds `guid`. `public_key` and `url` only
  /// fill fields that are still empty. Returns the person as stored
  /// afterwards, or `None` if they do not exist.
  fn update_identity(
    &self,
    person_id: Uuid,
    guid: Option<String>,
    public_key: Option<String>,
    url: Option<String>,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Delete a person together with every contact pointing at them. Returns
  /// `false` if the person did not exist.
  fn delete_person(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Swap the person's profile in a single write. Returns `false` if the
  /// person does not exist.
  fn replace_profile(
    &self,
    person_id: Uuid,
    profile: Option<Profile>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Aspects and contacts ──────────────────────────────────────────────

  fn create_aspect(
    &self,
    owner_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Aspect, Self::Error>> + Send + '_;

  fn get_aspect(
    &self,
    aspect_id: Uuid,
  ) -> impl Future<Output = Result<Option<Aspect>, Self::Error>> + Send + '_;

  fn list_aspects(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Aspect>, Self::Error>> + Send + '_;

  fn aspect_members(
    &self,
    aspect_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  fn find_contact(
    &self,
    owner_id: Uuid,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Create the contact for `(owner_id, person_id)`, or return the existing
  /// one.
  fn create_contact(
    &self,
    owner_id: Uuid,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  fn list_contacts(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Add a contact to an aspect. Returns `false` if it was already a member.
  fn add_to_aspect(
    &self,
    aspect_id: Uuid,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Ids of the aspects containing the contact.
  fn contact_aspects(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  /// Remove a contact from every aspect containing it and return the ids of
  /// the aspects that shrank.
  fn remove_from_all_aspects(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  fn delete_contact(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Content ───────────────────────────────────────────────────────────

  /// Store a post and make it visible in `aspect_ids`, as one atomic write.
  /// Returns `false`, changing nothing, if a post with the same guid already
  /// exists.
  fn insert_status_message(
    &self,
    post: StatusMessage,
    aspect_ids: Vec<Uuid>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_status_message<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Result<Option<StatusMessage>, Self::Error>> + Send + 'a;

  fn posts_by_author<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Vec<StatusMessage>, Self::Error>> + Send + 'a;

  /// Delete a post along with its comments and its visibility in every
  /// aspect.
  fn delete_status_message<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn unshare_post(
    &self,
    aspect_id: Uuid,
    post_guid: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The aspects a post is currently visible in.
  fn post_aspects<'a>(
    &'a self,
    post_guid: &'a str,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;

  /// Returns `false` if a comment with the same guid already exists.
  fn insert_comment(
    &self,
    comment: Comment,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_comment<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + 'a;

  fn delete_comment<'a>(
    &'a self,
    guid: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn comments_for<'a>(
    &'a self,
    post_guid: &'a str,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + 'a;

  // ── Requests ──────────────────────────────────────────────────────────

  /// Returns `false` if the owner already tracks a request with this guid.
  fn insert_request(
    &self,
    request: StoredRequest,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn find_request<'a>(
    &'a self,
    owner_id: Uuid,
    guid: &'a str,
  ) -> impl Future<Output = Result<Option<StoredRequest>, Self::Error>> + Send + 'a;

  fn set_request_state<'a>(
    &'a self,
    owner_id: Uuid,
    guid: &'a str,
    state: RequestState,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn delete_request<'a>(
    &'a self,
    owner_id: Uuid,
    guid: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The owner's outgoing `Pending` request addressed to `recipient`, if any.
  fn pending_outgoing_to<'a>(
    &'a self,
    owner_id: Uuid,
    recipient: &'a str,
  ) -> impl Future<Output = Result<Option<StoredRequest>, Self::Error>> + Send + 'a;

  /// Incoming requests still waiting for the owner's decision.
  fn pending_requests(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StoredRequest>, Self::Error>> + Send + '_;
}
