//! Receipt of content entities: status messages and comments.

use strand_core::{
  content::{Comment, StatusMessage},
  person::Person,
  store::FederationStore,
};
use tracing::debug;

use crate::{
  Error, Result,
  dispatch::{Applied, Dispatcher, Outcome},
  resolver::IdentityLookup,
};

impl<S, L> Dispatcher<S, L>
where
  S: FederationStore,
  L: IdentityLookup,
{
  /// Store a post and make it visible in every aspect of `recipient` that
  /// holds a contact for its author. The post and its visibility are written
  /// together.
  pub(crate) async fn apply_status_message(
    &self,
    recipient: &Person,
    author: &Person,
    mut post: StatusMessage,
  ) -> Result<Outcome> {
    post.author = author.handle.clone();

    let contact = self
      .store
      .find_contact(recipient.person_id, author.person_id)
      .await
      .map_err(Error::store)?;

    // membership is read under the aspect locks so it cannot shift before
    // the post lands
    let (aspect_ids, _guards) = match contact {
      Some(contact) => {
        let guards = self.lock_aspects(self.aspect_ids(recipient.person_id).await?).await;
        let ids = self
          .store
          .contact_aspects(contact.contact_id)
          .await
          .map_err(Error::store)?;
        (ids, guards)
      }
      None => {
        debug!(guid = %post.guid, author = %post.author, "post from a non-contact is not shared");
        (Vec::new(), Vec::new())
      }
    };

    let inserted = self
      .store
      .insert_status_message(post.clone(), aspect_ids)
      .await
      .map_err(Error::store)?;
    Ok(if inserted {
      Outcome::Applied(Applied::StatusMessage(post))
    } else {
      Outcome::AlreadyApplied
    })
  }

  /// Store a comment on a known post.
  pub(crate) async fn apply_comment(
    &self,
    author: &str,
    mut comment: Comment,
  ) -> Result<Outcome> {
    comment.author = author.to_string();

    if self
      .store
      .find_comment(&comment.guid)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Ok(Outcome::AlreadyApplied);
    }

    let parent = self
      .store
      .find_status_message(&comment.post_guid)
      .await
      .map_err(Error::store)?;
    if parent.is_none() {
      return Err(Error::UnknownParent {
        comment: comment.guid,
        post:    comment.post_guid,
      });
    }

    let inserted = self
      .store
      .insert_comment(comment.clone())
      .await
      .map_err(Error::store)?;
    Ok(if inserted {
      Outcome::Applied(Applied::Comment(comment))
    } else {
      Outcome::AlreadyApplied
    })
  }
}
