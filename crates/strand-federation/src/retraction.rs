//! Retraction handling.
//!
//! A retraction names a target by type and guid. The target is located, its
//! author checked against the sender, and the target removed from the store
//! and from every aspect that referenced it. An unknown target is a no-op.

use std::collections::HashSet;

use strand_core::{
  person::Person,
  retraction::{EntityKind, Retraction},
  store::FederationStore,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  dispatch::{Applied, Dispatcher, Outcome},
  resolver::IdentityLookup,
};

/// What retracting a person removes besides the contact itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContactRetraction {
  /// Drop the contact from every aspect and delete it. Posts stay.
  #[default]
  ContactOnly,
  /// Also hide the person's posts from the recipient's aspects, deleting any
  /// post left visible nowhere.
  CascadeContent,
}

fn check_author(kind: EntityKind, guid: &str, author: &str, claimed: &str) -> Result<()> {
  if author == claimed {
    return Ok(());
  }
  warn!(%kind, guid, author, claimed, "retraction from someone other than the author");
  Err(Error::SenderMismatch {
    claimed: claimed.to_string(),
    author:  author.to_string(),
  })
}

impl<S, L> Dispatcher<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  pub(crate) async fn apply_retraction(
    &self,
    recipient: &Person,
    claimed: &str,
    retraction: Retraction,
  ) -> Result<Outcome> {
    let Retraction {
      target_kind,
      target_guid,
      ..
    } = retraction;

    let removed = match target_kind {
      EntityKind::StatusMessage => {
        self.retract_status_message(&target_guid, claimed).await?
      }
      EntityKind::Comment => self.retract_comment(&target_guid, claimed).await?,
      EntityKind::Person => {
        self.retract_person(recipient, &target_guid, claimed).await?
      }
    };

    Ok(if removed {
      Outcome::Applied(Applied::Retracted {
        kind: target_kind,
        guid: target_guid,
      })
    } else {
      Outcome::AlreadyApplied
    })
  }

  async fn retract_status_message(&self, guid: &str, claimed: &str) -> Result<bool> {
    let Some(post) = self
      .store
      .find_status_message(guid)
      .await
      .map_err(Error::store)?
    else {
      return Ok(false);
    };
    check_author(EntityKind::StatusMessage, guid, &post.author, claimed)?;

    // comments and aspect visibility go with the post
    self
      .store
      .delete_status_message(guid)
      .await
      .map_err(Error::store)
  }

  async fn retract_comment(&self, guid: &str, claimed: &str) -> Result<bool> {
    let Some(comment) = self.store.find_comment(guid).await.map_err(Error::store)?
    else {
      return Ok(false);
    };
    check_author(EntityKind::Comment, guid, &comment.author, claimed)?;

    self.store.delete_comment(guid).await.map_err(Error::store)
  }

  async fn retract_person(
    &self,
    recipient: &Person,
    guid: &str,
    claimed: &str,
  ) -> Result<bool> {
    let Some(person) = self
      .store
      .find_person_by_guid(guid)
      .await
      .map_err(Error::store)?
    else {
      return Ok(false);
    };
    check_author(EntityKind::Person, guid, &person.handle, claimed)?;

    let Some(contact) = self
      .store
      .find_contact(recipient.person_id, person.person_id)
      .await
      .map_err(Error::store)?
    else {
      return Ok(false);
    };

    let owned = self.aspect_ids(recipient.person_id).await?;
    let _guards = self.lock_aspects(owned.clone()).await;

    let shrunk = self
      .store
      .remove_from_all_aspects(contact.contact_id)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_contact(contact.contact_id)
      .await
      .map_err(Error::store)?;
    info!(
      recipient = %recipient.handle,
      person = %person.handle,
      aspects = shrunk.len(),
      "removed contact"
    );

    if self.config.contact_retraction == ContactRetraction::CascadeContent {
      self.hide_posts_of(&person, owned.into_iter().collect()).await?;
    }

    Ok(true)
  }

  /// Remove `author`'s posts from `aspects`, deleting posts left with no
  /// visibility at all.
  async fn hide_posts_of(&self, author: &Person, aspects: HashSet<Uuid>) -> Result<()> {
    let posts = self
      .store
      .posts_by_author(&author.handle)
      .await
      .map_err(Error::store)?;

    for post in posts {
      let visible_in = self
        .store
        .post_aspects(&post.guid)
        .await
        .map_err(Error::store)?;
      for aspect_id in visible_in.iter().filter(|id| aspects.contains(*id)) {
        self
          .store
          .unshare_post(*aspect_id, post.guid.clone())
          .await
          .map_err(Error::store)?;
      }

      let remaining = self
        .store
        .post_aspects(&post.guid)
        .await
        .map_err(Error::store)?;
      if remaining.is_empty() {
        self
          .store
          .delete_status_message(&post.guid)
          .await
          .map_err(Error::store)?;
      }
    }
    Ok(())
  }
}
