//! The receive pipeline.
//!
//! `receive` takes one inbound document for one local recipient and either
//! applies it exactly once or rejects it without touching the store:
//!
//! 1. size check, then envelope decoding (`Parse`)
//! 2. registry lookup on the root tag (`UnsupportedType`, soft)
//! 3. schema mapping (`MissingField` / `InvalidField`)
//! 4. authorization binding of claimed sender to embedded author
//! 5. per-key lock, duplicate check, apply
//!
//! Locks are always taken in the order message key, person, aspect.

use std::sync::Arc;

use strand_core::{
  aspect::Contact,
  content::{Comment, StatusMessage},
  message::Message,
  person::{Person, normalize_handle, origin_of},
  request::StoredRequest,
  retraction::EntityKind,
  store::FederationStore,
};
use strand_xml::decode_envelope;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  locks::{KeyGuard, KeyedLocks},
  registry,
  resolver::{IdentityLookup, IdentityResolver, NoLookup, RemoteIdentity},
  retraction::ContactRetraction,
};

pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
  pub max_message_bytes:  usize,
  pub contact_retraction: ContactRetraction,
}

impl Default for DispatchConfig {
  fn default() -> Self {
    Self {
      max_message_bytes:  DEFAULT_MAX_MESSAGE_BYTES,
      contact_retraction: ContactRetraction::default(),
    }
  }
}

/// The effect of a successfully handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Applied(Applied),
  /// The effect was already present; nothing changed.
  AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
  StatusMessage(StatusMessage),
  Comment(Comment),
  /// A fresh incoming request, stored for the recipient's decision.
  Request(StoredRequest),
  /// A handshake completed: the reverse of an outgoing request arrived.
  Contact(Contact),
  Profile(Person),
  Retracted { kind: EntityKind, guid: String },
}

impl Outcome {
  pub fn is_applied(&self) -> bool { matches!(self, Self::Applied(_)) }
}

pub struct Dispatcher<S, L = NoLookup> {
  pub(crate) store:    Arc<S>,
  pub(crate) resolver: IdentityResolver<S, L>,
  pub(crate) locks:    KeyedLocks,
  pub(crate) config:   DispatchConfig,
}

impl<S: FederationStore> Dispatcher<S, NoLookup> {
  pub fn with_store(store: Arc<S>, config: DispatchConfig) -> Self {
    Self::new(store, NoLookup, config)
  }
}

impl<S, L> Dispatcher<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  pub fn new(store: Arc<S>, lookup: L, config: DispatchConfig) -> Self {
    Self {
      resolver: IdentityResolver::new(store.clone(), lookup),
      store,
      locks: KeyedLocks::new(),
      config,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn resolver(&self) -> &IdentityResolver<S, L> { &self.resolver }

  pub fn config(&self) -> &DispatchConfig { &self.config }

  /// Handle one inbound document addressed to `recipient`, sent by the node
  /// of `claimed_sender`.
  pub async fn receive(
    &self,
    recipient: &Person,
    xml: &[u8],
    claimed_sender: &str,
  ) -> Result<Outcome> {
    let limit = self.config.max_message_bytes;
    if xml.len() > limit {
      warn!(size = xml.len(), limit, "rejecting oversized message");
      return Err(Error::Oversized { size: xml.len(), limit });
    }

    let claimed = normalize_handle(claimed_sender)?;

    let envelope = decode_envelope(xml).map_err(|e| {
      warn!(sender = %claimed, error = %e, "rejecting unparseable message");
      Error::Parse(e)
    })?;

    let spec = registry::resolve(&envelope.tag).inspect_err(|_| {
      info!(sender = %claimed, tag = %envelope.tag, "ignoring unsupported message type");
    })?;

    let message = Message::try_from(&envelope).map_err(|e| {
      warn!(sender = %claimed, tag = %envelope.tag, error = %e, "rejecting message");
      Error::from(e)
    })?;

    if spec.requires_author_binding {
      let author = normalize_handle(message.author_handle())?;
      if author != claimed {
        warn!(
          claimed = %claimed,
          author = %author,
          tag = %envelope.tag,
          "sender does not match embedded author; possible forgery"
        );
        return Err(Error::SenderMismatch { claimed, author });
      }
    }

    let _guard = self.locks.lock(registry::dedup_key(&message)).await;

    let outcome = match message {
      Message::StatusMessage(post) => {
        let author = self.sender(&claimed, RemoteIdentity::default()).await?;
        self.apply_status_message(recipient, &author, post).await?
      }
      Message::Comment(comment) => {
        self.sender(&claimed, RemoteIdentity::default()).await?;
        self.apply_comment(&claimed, comment).await?
      }
      Message::Retraction(retraction) => {
        self.apply_retraction(recipient, &claimed, retraction).await?
      }
      Message::Request(request) => {
        let hint = RemoteIdentity {
          guid:       request.sender_guid.clone(),
          public_key: request.exported_key.clone(),
          url:        request.callback_url.as_deref().and_then(origin_of),
        };
        let sender = self.sender(&claimed, hint).await?;
        self.apply_request(recipient, &sender, request).await?
      }
      Message::Profile(profile) => {
        let owner = self.sender(&claimed, RemoteIdentity::default()).await?;
        self.apply_profile(owner, profile.profile).await?
      }
    };

    match &outcome {
      Outcome::Applied(applied) => {
        info!(recipient = %recipient.handle, sender = %claimed, kind = ?spec.kind, ?applied, "applied message");
      }
      Outcome::AlreadyApplied => {
        debug!(recipient = %recipient.handle, sender = %claimed, kind = ?spec.kind, "message already applied");
      }
    }
    Ok(outcome)
  }

  async fn sender(&self, handle: &str, hint: RemoteIdentity) -> Result<Person> {
    self.resolver.resolve_or_create(handle, hint).await
  }

  // ─── Shared helpers ────────────────────────────────────────────────────────

  /// Lock the given aspects in id order.
  pub(crate) async fn lock_aspects(&self, mut aspect_ids: Vec<Uuid>) -> Vec<KeyGuard<'_>> {
    aspect_ids.sort();
    aspect_ids.dedup();
    let mut guards = Vec::with_capacity(aspect_ids.len());
    for id in aspect_ids {
      guards.push(self.locks.lock(format!("aspect:{id}")).await);
    }
    guards
  }

  /// Ids of every aspect owned by `owner_id`.
  pub(crate) async fn aspect_ids(&self, owner_id: Uuid) -> Result<Vec<Uuid>> {
    Ok(
      self
        .store
        .list_aspects(owner_id)
        .await
        .map_err(Error::store)?
        .into_iter()
        .map(|a| a.aspect_id)
        .collect(),
    )
  }
}
