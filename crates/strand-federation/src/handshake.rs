//! The request/accept handshake.
//!
//! Each side of a handshake tracks one [`StoredRequest`]:
//!
//! - the initiator stores an outgoing `Pending` request with the aspect the
//!   new contact should land in;
//! - the other side stores the received request as incoming `Pending` until
//!   its user accepts (`Reversed`, counter-request sent) or ignores it;
//! - when the counter-request reaches the initiator, the contact is created
//!   in the recorded aspect and the outgoing request becomes `Accepted`. A
//!   fresh request from someone we are still waiting on counts the same way.
//!
//! Both directions share one lock key, so a request and its reverse never
//! race each other.

use chrono::Utc;
use strand_core::{
  aspect::Contact,
  person::{Person, normalize_handle},
  request::{Request, RequestDirection, RequestState, StoredRequest},
  store::FederationStore,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  dispatch::{Applied, Dispatcher, Outcome},
  registry::handshake_key,
  resolver::{IdentityLookup, RemoteIdentity},
};

impl<S, L> Dispatcher<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  // ─── Local operations ──────────────────────────────────────────────────────

  /// Start a handshake from `user` towards `to`. The returned request is
  /// ready to serialize and deliver.
  pub async fn send_request(
    &self,
    user: &Person,
    to: &str,
    aspect_id: Uuid,
  ) -> Result<Request> {
    let to = normalize_handle(to)?;
    self.check_aspect_owner(user, aspect_id).await?;

    let _guard = self.locks.lock(handshake_key(&user.handle, &to)).await;
    let request = Request::instantiate(to, user);
    self
      .store
      .insert_request(StoredRequest {
        owner_id:   user.person_id,
        request:    request.clone(),
        direction:  RequestDirection::Outgoing,
        state:      RequestState::Pending,
        aspect_id:  Some(aspect_id),
        created_at: Utc::now(),
      })
      .await
      .map_err(Error::store)?;

    info!(from = %user.handle, to = %request.recipient, guid = %request.guid, "sent request");
    Ok(request)
  }

  /// Accept an incoming request: the sender becomes a contact in
  /// `aspect_id`, and the counter-request to deliver back is returned.
  pub async fn accept_request(
    &self,
    user: &Person,
    guid: &str,
    aspect_id: Uuid,
  ) -> Result<Request> {
    self.check_aspect_owner(user, aspect_id).await?;
    let stored = self.pending_incoming(user, guid).await?;

    let _guard = self
      .locks
      .lock(handshake_key(&user.handle, &stored.request.sender))
      .await;
    // re-read under the lock; a concurrent accept or ignore may have won
    let stored = self.pending_incoming(user, guid).await?;
    let request = stored.request;

    let sender = self
      .resolver
      .resolve_or_create(&request.sender, RemoteIdentity {
        guid:       request.sender_guid.clone(),
        public_key: request.exported_key.clone(),
        url:        request
          .callback_url
          .as_deref()
          .and_then(strand_core::person::origin_of),
      })
      .await?;

    self.connect(user, &sender, Some(aspect_id)).await?;
    self
      .store
      .set_request_state(user.person_id, guid, RequestState::Reversed)
      .await
      .map_err(Error::store)?;

    info!(user = %user.handle, sender = %sender.handle, guid, "accepted request");
    Ok(request.reverse_for(user))
  }

  /// Drop an incoming request without answering it.
  pub async fn ignore_request(&self, user: &Person, guid: &str) -> Result<()> {
    let stored = self.pending_incoming(user, guid).await?;
    let _guard = self
      .locks
      .lock(handshake_key(&user.handle, &stored.request.sender))
      .await;
    self
      .store
      .delete_request(user.person_id, guid)
      .await
      .map_err(Error::store)?;
    info!(user = %user.handle, sender = %stored.request.sender, guid, "ignored request");
    Ok(())
  }

  /// Incoming requests waiting for `user`'s decision.
  pub async fn pending_requests(&self, user: &Person) -> Result<Vec<StoredRequest>> {
    self
      .store
      .pending_requests(user.person_id)
      .await
      .map_err(Error::store)
  }

  // ─── Receipt ───────────────────────────────────────────────────────────────

  pub(crate) async fn apply_request(
    &self,
    recipient: &Person,
    sender: &Person,
    request: Request,
  ) -> Result<Outcome> {
    let addressee = normalize_handle(&request.recipient)?;
    if addressee != recipient.handle {
      warn!(recipient = %recipient.handle, addressee = %addressee, "request for someone else");
      return Err(Error::Misaddressed(addressee));
    }

    let known = self
      .store
      .find_request(recipient.person_id, &request.guid)
      .await
      .map_err(Error::store)?;

    if let Some(known) = known {
      return match known.direction {
        RequestDirection::Incoming => Ok(Outcome::AlreadyApplied),
        RequestDirection::Outgoing if known.request.recipient != sender.handle => {
          warn!(
            guid = %request.guid,
            expected = %known.request.recipient,
            sender = %sender.handle,
            "reverse request from the wrong person"
          );
          Err(Error::SenderMismatch {
            claimed: sender.handle.clone(),
            author:  known.request.recipient,
          })
        }
        RequestDirection::Outgoing if known.state == RequestState::Accepted => {
          Ok(Outcome::AlreadyApplied)
        }
        RequestDirection::Outgoing => {
          let contact = self.connect(recipient, sender, known.aspect_id).await?;
          self
            .store
            .set_request_state(recipient.person_id, &request.guid, RequestState::Accepted)
            .await
            .map_err(Error::store)?;
          Ok(Outcome::Applied(Applied::Contact(contact)))
        }
      };
    }

    // both sides asked at once: their request answers ours
    let crossed = self
      .store
      .pending_outgoing_to(recipient.person_id, &sender.handle)
      .await
      .map_err(Error::store)?;
    if let Some(ours) = crossed {
      let contact = self.connect(recipient, sender, ours.aspect_id).await?;
      self
        .store
        .set_request_state(recipient.person_id, &ours.request.guid, RequestState::Accepted)
        .await
        .map_err(Error::store)?;
      info!(
        recipient = %recipient.handle,
        sender = %sender.handle,
        ours = %ours.request.guid,
        theirs = %request.guid,
        "crossed requests completed the handshake"
      );
      return Ok(Outcome::Applied(Applied::Contact(contact)));
    }

    let existing = self
      .store
      .find_contact(recipient.person_id, sender.person_id)
      .await
      .map_err(Error::store)?;
    if existing.is_some() {
      return Ok(Outcome::AlreadyApplied);
    }

    let stored = StoredRequest {
      owner_id: recipient.person_id,
      request,
      direction: RequestDirection::Incoming,
      state: RequestState::Pending,
      aspect_id: None,
      created_at: Utc::now(),
    };
    let inserted = self
      .store
      .insert_request(stored.clone())
      .await
      .map_err(Error::store)?;
    Ok(if inserted {
      Outcome::Applied(Applied::Request(stored))
    } else {
      Outcome::AlreadyApplied
    })
  }

  // ─── Helpers ───────────────────────────────────────────────────────────────

  /// Create the contact (if missing) and put it in `aspect_id`.
  async fn connect(
    &self,
    owner: &Person,
    person: &Person,
    aspect_id: Option<Uuid>,
  ) -> Result<Contact> {
    let contact = self
      .store
      .create_contact(owner.person_id, person.person_id)
      .await
      .map_err(Error::store)?;

    if let Some(aspect_id) = aspect_id {
      let _guards = self.lock_aspects(vec![aspect_id]).await;
      self
        .store
        .add_to_aspect(aspect_id, contact.contact_id)
        .await
        .map_err(Error::store)?;
    }
    Ok(contact)
  }

  async fn check_aspect_owner(&self, user: &Person, aspect_id: Uuid) -> Result<()> {
    let aspect = self
      .store
      .get_aspect(aspect_id)
      .await
      .map_err(Error::store)?;
    match aspect {
      Some(a) if a.owner_id == user.person_id => Ok(()),
      _ => Err(Error::UnknownAspect(aspect_id)),
    }
  }

  async fn pending_incoming(&self, user: &Person, guid: &str) -> Result<StoredRequest> {
    self
      .store
      .find_request(user.person_id, guid)
      .await
      .map_err(Error::store)?
      .filter(|r| {
        r.direction == RequestDirection::Incoming && r.state == RequestState::Pending
      })
      .ok_or_else(|| Error::UnknownRequest(guid.to_string()))
  }
}
