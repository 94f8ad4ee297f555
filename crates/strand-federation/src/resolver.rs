//! Identity resolver.
//!
//! Maps a handle to its stored [`Person`], creating a minimal placeholder the
//! first time a handle is seen. Creation for one handle happens at most once,
//! even when many messages from an unseen sender arrive together.

use std::{future::Future, sync::Arc};

use strand_core::{
  person::{NewPerson, Person, normalize_handle},
  store::FederationStore,
};
use tracing::{debug, info, warn};

use crate::{Error, Result, locks::KeyedLocks};

/// What is known about a remote person before it is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteIdentity {
  pub guid:       Option<String>,
  pub public_key: Option<String>,
  /// Origin of the person's home node.
  pub url:        Option<String>,
}

impl RemoteIdentity {
  /// Fill fields missing from `self` with those of `other`.
  pub fn or(self, other: Option<RemoteIdentity>) -> Self {
    let Some(other) = other else { return self };
    Self {
      guid:       self.guid.or(other.guid),
      public_key: self.public_key.or(other.public_key),
      url:        self.url.or(other.url),
    }
  }
}

/// External directory consulted for handles whose key material did not
/// arrive with the message (e.g. WebFinger).
pub trait IdentityLookup: Send + Sync {
  fn lookup<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Option<RemoteIdentity>> + Send + 'a;
}

/// Lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl IdentityLookup for NoLookup {
  async fn lookup(&self, _handle: &str) -> Option<RemoteIdentity> { None }
}

pub struct IdentityResolver<S, L = NoLookup> {
  store:  Arc<S>,
  lookup: L,
  locks:  KeyedLocks,
}

impl<S, L> IdentityResolver<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  pub fn new(store: Arc<S>, lookup: L) -> Self {
    Self {
      store,
      lookup,
      locks: KeyedLocks::new(),
    }
  }

  /// The stored person for `handle`, if any.
  pub async fn find(&self, handle: &str) -> Result<Option<Person>> {
    let handle = normalize_handle(handle)?;
    self
      .store
      .find_person_by_handle(&handle)
      .await
      .map_err(Error::store)
  }

  /// The stored person for `handle`, created from `hint` (or the lookup
  /// collaborator) if the handle has never been seen.
  pub async fn resolve_or_create(
    &self,
    handle: &str,
    hint: RemoteIdentity,
  ) -> Result<Person> {
    let handle = normalize_handle(handle)?;
    if let Some(person) = self.stored(&handle).await? {
      return self.complete(person, hint).await;
    }

    let _guard = self.locks.lock(format!("person:{handle}")).await;
    if let Some(person) = self.stored(&handle).await? {
      return self.complete(person, hint).await;
    }

    let identity = if hint.public_key.is_none() {
      let found = self.lookup.lookup(&handle).await;
      hint.or(found)
    } else {
      hint
    };

    // create_person re-reads on a handle conflict, so a writer outside this
    // process still yields the single stored row
    let claimed_guid = identity.guid.clone();
    let person = self
      .store
      .create_person(NewPerson {
        handle:     handle.clone(),
        guid:       identity.guid,
        public_key: identity.public_key,
        url:        identity.url,
      })
      .await
      .map_err(Error::store)?;

    if let Some(claimed) = claimed_guid
      && claimed != person.guid
    {
      warn!(handle = %person.handle, %claimed, "guid already belongs to someone else");
    }
    info!(handle = %person.handle, guid = %person.guid, "stored new remote person");
    Ok(person)
  }

  /// Fold identity details the stored row still lacks into it. A guid the
  /// store generated for a placeholder gives way to the person's real one.
  async fn complete(&self, person: Person, hint: RemoteIdentity) -> Result<Person> {
    let guid = hint.guid.filter(|g| *g != person.guid);
    let public_key = hint.public_key.filter(|_| person.public_key.is_none());
    let url = hint.url.filter(|_| person.url.is_none());
    if guid.is_none() && public_key.is_none() && url.is_none() {
      return Ok(person);
    }

    let updated = self
      .store
      .update_identity(person.person_id, guid.clone(), public_key, url)
      .await
      .map_err(Error::store)?;
    let Some(updated) = updated else {
      // deleted meanwhile; the caller's next write fails or is a no-op
      return Ok(person);
    };

    if let Some(guid) = guid {
      if updated.guid == guid {
        info!(handle = %updated.handle, %guid, previous = %person.guid, "learned remote guid");
      } else {
        debug!(handle = %updated.handle, %guid, kept = %updated.guid, "kept stored guid");
      }
    }
    Ok(updated)
  }

  async fn stored(&self, handle: &str) -> Result<Option<Person>> {
    self
      .store
      .find_person_by_handle(handle)
      .await
      .map_err(Error::store)
  }
}
