//! [`SqliteStore`], the SQLite implementation of [`FederationStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use strand_core::{
  aspect::{Aspect, Contact},
  content::{Comment, StatusMessage},
  person::{NewPerson, Person, Profile},
  request::{RequestState, StoredRequest},
  store::FederationStore,
};

use crate::{
  Result,
  encode::{
    PERSON_COLUMNS, REQUEST_COLUMNS, RawAspect, RawComment, RawContact,
    RawPerson, RawRequest, RawStatusMessage, decode_uuid, encode_direction,
    encode_dt, encode_profile, encode_uuid,
  },
  schema::SCHEMA,
};

const ASPECT_COLUMNS: &str = "aspect_id, owner_id, name, created_at";
const CONTACT_COLUMNS: &str = "contact_id, owner_id, person_id, created_at";
const STATUS_COLUMNS: &str = "guid, author, message, public, created_at";
const COMMENT_COLUMNS: &str = "guid, post_guid, author, text, created_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Strand store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch a single person by an arbitrary unique column.
  async fn person_where(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PERSON_COLUMNS} FROM people WHERE {column} = ?1"),
              rusqlite::params![value],
              RawPerson::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn contacts_where(
    &self,
    sql: &'static str,
    id: Uuid,
  ) -> Result<Vec<Contact>> {
    let id_str = encode_uuid(id);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  /// Run a single-row statement and report whether it changed anything.
  async fn execute_changed(
    &self,
    sql: &'static str,
    params: Vec<String>,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(sql, rusqlite::params_from_iter(params.iter()))?)
      })
      .await?;
    Ok(changed > 0)
  }
}

/// Whether some person already holds `guid`.
fn guid_taken(conn: &rusqlite::Connection, guid: &str) -> rusqlite::Result<bool> {
  conn
    .query_row("SELECT 1 FROM people WHERE guid = ?1", rusqlite::params![guid], |_| {
      Ok(())
    })
    .optional()
    .map(|found| found.is_some())
}

// ─── FederationStore impl ────────────────────────────────────────────────────

impl FederationStore for SqliteStore {
  type Error = crate::Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn find_person_by_handle(&self, handle: &str) -> Result<Option<Person>> {
    self.person_where("handle", handle.to_owned()).await
  }

  async fn find_person_by_guid(&self, guid: &str) -> Result<Option<Person>> {
    self.person_where("guid", guid.to_owned()).await
  }

  async fn get_person(&self, person_id: Uuid) -> Result<Option<Person>> {
    self.person_where("person_id", encode_uuid(person_id)).await
  }

  async fn create_person(&self, input: NewPerson) -> Result<Person> {
    let id_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());
    let NewPerson {
      handle,
      guid: requested,
      public_key: key,
      url,
    } = input;

    let raw: RawPerson = self
      .conn
      .call(move |conn| {
        // Insert-or-keep and read back in one transaction, so concurrent
        // creators of the same handle all observe the single surviving row.
        let tx = conn.transaction()?;
        let remote = match requested {
          Some(guid) if !guid_taken(&tx, &guid)? => Some(guid),
          _ => None,
        };
        let guid_local = remote.is_none();
        let guid = remote.unwrap_or_else(|| Uuid::new_v4().to_string());

        tx.execute(
          "INSERT INTO people (person_id, guid, guid_local, handle, public_key, url, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(handle) DO NOTHING",
          rusqlite::params![id_str, guid, guid_local, handle, key, url, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {PERSON_COLUMNS} FROM people WHERE handle = ?1"),
          rusqlite::params![handle],
          RawPerson::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_person()
  }

  async fn update_identity(
    &self,
    person_id: Uuid,
    guid: Option<String>,
    public_key: Option<String>,
    url: Option<String>,
  ) -> Result<Option<Person>> {
    let id_str = encode_uuid(person_id);

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(guid) = guid
          && !guid_taken(&tx, &guid)?
        {
          tx.execute(
            "UPDATE people SET guid = ?2, guid_local = 0
             WHERE person_id = ?1 AND guid_local = 1",
            rusqlite::params![id_str, guid],
          )?;
        }
        tx.execute(
          "UPDATE people
           SET public_key = COALESCE(public_key, ?2), url = COALESCE(url, ?3)
           WHERE person_id = ?1",
          rusqlite::params![id_str, public_key, url],
        )?;
        let raw = tx
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE person_id = ?1"),
            rusqlite::params![id_str],
            RawPerson::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn delete_person(&self, person_id: Uuid) -> Result<bool> {
    self
      .execute_changed("DELETE FROM people WHERE person_id = ?1", vec![
        encode_uuid(person_id),
      ])
      .await
  }

  async fn replace_profile(
    &self,
    person_id: Uuid,
    profile: Option<Profile>,
  ) -> Result<bool> {
    let id_str       = encode_uuid(person_id);
    let profile_json = encode_profile(profile.as_ref())?;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE people SET profile_json = ?2 WHERE person_id = ?1",
          rusqlite::params![id_str, profile_json],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  // ── Aspects and contacts ──────────────────────────────────────────────────

  async fn create_aspect(&self, owner_id: Uuid, name: String) -> Result<Aspect> {
    let aspect = Aspect {
      aspect_id: Uuid::new_v4(),
      owner_id,
      name,
      created_at: Utc::now(),
    };

    let id_str    = encode_uuid(aspect.aspect_id);
    let owner_str = encode_uuid(owner_id);
    let name      = aspect.name.clone();
    let at_str    = encode_dt(aspect.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO aspects (aspect_id, owner_id, name, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, owner_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(aspect)
  }

  async fn get_aspect(&self, aspect_id: Uuid) -> Result<Option<Aspect>> {
    let id_str = encode_uuid(aspect_id);

    let raw: Option<RawAspect> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ASPECT_COLUMNS} FROM aspects WHERE aspect_id = ?1"),
              rusqlite::params![id_str],
              RawAspect::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAspect::into_aspect).transpose()
  }

  async fn list_aspects(&self, owner_id: Uuid) -> Result<Vec<Aspect>> {
    let owner_str = encode_uuid(owner_id);

    let raws: Vec<RawAspect> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASPECT_COLUMNS} FROM aspects WHERE owner_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawAspect::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAspect::into_aspect).collect()
  }

  async fn aspect_members(&self, aspect_id: Uuid) -> Result<Vec<Contact>> {
    self
      .contacts_where(
        "SELECT c.contact_id, c.owner_id, c.person_id, c.created_at
         FROM contacts c
         JOIN aspect_memberships m ON m.contact_id = c.contact_id
         WHERE m.aspect_id = ?1",
        aspect_id,
      )
      .await
  }

  async fn find_contact(
    &self,
    owner_id: Uuid,
    person_id: Uuid,
  ) -> Result<Option<Contact>> {
    let owner_str  = encode_uuid(owner_id);
    let person_str = encode_uuid(person_id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE owner_id = ?1 AND person_id = ?2"
              ),
              rusqlite::params![owner_str, person_str],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn create_contact(&self, owner_id: Uuid, person_id: Uuid) -> Result<Contact> {
    let id_str     = encode_uuid(Uuid::new_v4());
    let owner_str  = encode_uuid(owner_id);
    let person_str = encode_uuid(person_id);
    let at_str     = encode_dt(Utc::now());

    let raw: RawContact = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (contact_id, owner_id, person_id, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(owner_id, person_id) DO NOTHING",
          rusqlite::params![id_str, owner_str, person_str, at_str],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = ?1 AND person_id = ?2"
          ),
          rusqlite::params![owner_str, person_str],
          RawContact::from_row,
        )?)
      })
      .await?;

    raw.into_contact()
  }

  async fn list_contacts(&self, owner_id: Uuid) -> Result<Vec<Contact>> {
    self
      .contacts_where(
        "SELECT contact_id, owner_id, person_id, created_at
         FROM contacts WHERE owner_id = ?1",
        owner_id,
      )
      .await
  }

  async fn add_to_aspect(&self, aspect_id: Uuid, contact_id: Uuid) -> Result<bool> {
    self
      .execute_changed(
        "INSERT OR IGNORE INTO aspect_memberships (aspect_id, contact_id) VALUES (?1, ?2)",
        vec![encode_uuid(aspect_id), encode_uuid(contact_id)],
      )
      .await
  }

  async fn contact_aspects(&self, contact_id: Uuid) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(contact_id);

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT aspect_id FROM aspect_memberships WHERE contact_id = ?1 ORDER BY aspect_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn remove_from_all_aspects(&self, contact_id: Uuid) -> Result<Vec<Uuid>> {
    let id_str = encode_uuid(contact_id);

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = {
          let mut stmt = tx
            .prepare("SELECT aspect_id FROM aspect_memberships WHERE contact_id = ?1")?;
          stmt
            .query_map(rusqlite::params![id_str], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };
        tx.execute(
          "DELETE FROM aspect_memberships WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(ids)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn delete_contact(&self, contact_id: Uuid) -> Result<bool> {
    self
      .execute_changed("DELETE FROM contacts WHERE contact_id = ?1", vec![
        encode_uuid(contact_id),
      ])
      .await
  }

  // ── Content ───────────────────────────────────────────────────────────────

  async fn insert_status_message(
    &self,
    post: StatusMessage,
    aspect_ids: Vec<Uuid>,
  ) -> Result<bool> {
    let at_str = encode_dt(post.created_at);
    let aspects: Vec<String> = aspect_ids.into_iter().map(encode_uuid).collect();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "INSERT OR IGNORE INTO status_messages (guid, author, message, public, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![post.guid, post.author, post.message, post.public, at_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        for aspect in &aspects {
          tx.execute(
            "INSERT OR IGNORE INTO post_visibilities (aspect_id, post_guid) VALUES (?1, ?2)",
            rusqlite::params![aspect, post.guid],
          )?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn find_status_message(&self, guid: &str) -> Result<Option<StatusMessage>> {
    let guid = guid.to_owned();

    let raw: Option<RawStatusMessage> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {STATUS_COLUMNS} FROM status_messages WHERE guid = ?1"),
              rusqlite::params![guid],
              RawStatusMessage::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawStatusMessage::into_status_message).transpose()
  }

  async fn posts_by_author(&self, handle: &str) -> Result<Vec<StatusMessage>> {
    let handle = handle.to_owned();

    let raws: Vec<RawStatusMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STATUS_COLUMNS} FROM status_messages WHERE author = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![handle], RawStatusMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawStatusMessage::into_status_message)
      .collect()
  }

  async fn delete_status_message(&self, guid: &str) -> Result<bool> {
    // Comments and visibilities go with it via ON DELETE CASCADE.
    self
      .execute_changed("DELETE FROM status_messages WHERE guid = ?1", vec![
        guid.to_owned(),
      ])
      .await
  }

  async fn unshare_post(&self, aspect_id: Uuid, post_guid: String) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM post_visibilities WHERE aspect_id = ?1 AND post_guid = ?2",
        vec![encode_uuid(aspect_id), post_guid],
      )
      .await
  }

  async fn post_aspects(&self, post_guid: &str) -> Result<Vec<Uuid>> {
    let guid = post_guid.to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT aspect_id FROM post_visibilities WHERE post_guid = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![guid], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn insert_comment(&self, comment: Comment) -> Result<bool> {
    let at_str = comment.created_at.map(encode_dt);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO comments (guid, post_guid, author, text, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            comment.guid,
            comment.post_guid,
            comment.author,
            comment.text,
            at_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn find_comment(&self, guid: &str) -> Result<Option<Comment>> {
    let guid = guid.to_owned();

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE guid = ?1"),
              rusqlite::params![guid],
              RawComment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawComment::into_comment).transpose()
  }

  async fn delete_comment(&self, guid: &str) -> Result<bool> {
    self
      .execute_changed("DELETE FROM comments WHERE guid = ?1", vec![guid.to_owned()])
      .await
  }

  async fn comments_for(&self, post_guid: &str) -> Result<Vec<Comment>> {
    let guid = post_guid.to_owned();

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_guid = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![guid], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Requests ──────────────────────────────────────────────────────────────

  async fn insert_request(&self, stored: StoredRequest) -> Result<bool> {
    let owner_str  = encode_uuid(stored.owner_id);
    let direction  = encode_direction(stored.direction);
    let state      = stored.state.as_str();
    let aspect_str = stored.aspect_id.map(encode_uuid);
    let at_str     = encode_dt(stored.created_at);
    let request    = stored.request;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "INSERT OR IGNORE INTO requests ({REQUEST_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
          ),
          rusqlite::params![
            owner_str,
            request.guid,
            request.sender,
            request.sender_guid,
            request.recipient,
            request.callback_url,
            request.exported_key,
            direction,
            state,
            aspect_str,
            at_str,
          ],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn find_request(
    &self,
    owner_id: Uuid,
    guid: &str,
  ) -> Result<Option<StoredRequest>> {
    let owner_str = encode_uuid(owner_id);
    let guid      = guid.to_owned();

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REQUEST_COLUMNS} FROM requests WHERE owner_id = ?1 AND guid = ?2"
              ),
              rusqlite::params![owner_str, guid],
              RawRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_stored).transpose()
  }

  async fn set_request_state(
    &self,
    owner_id: Uuid,
    guid: &str,
    state: RequestState,
  ) -> Result<bool> {
    self
      .execute_changed(
        "UPDATE requests SET state = ?3 WHERE owner_id = ?1 AND guid = ?2",
        vec![encode_uuid(owner_id), guid.to_owned(), state.as_str().to_owned()],
      )
      .await
  }

  async fn delete_request(&self, owner_id: Uuid, guid: &str) -> Result<bool> {
    self
      .execute_changed(
        "DELETE FROM requests WHERE owner_id = ?1 AND guid = ?2",
        vec![encode_uuid(owner_id), guid.to_owned()],
      )
      .await
  }

  async fn pending_outgoing_to(
    &self,
    owner_id: Uuid,
    recipient: &str,
  ) -> Result<Option<StoredRequest>> {
    let owner_str = encode_uuid(owner_id);
    let recipient = recipient.to_owned();

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REQUEST_COLUMNS} FROM requests
                 WHERE owner_id = ?1 AND recipient = ?2
                   AND direction = 'outgoing' AND state = 'pending'
                 ORDER BY created_at LIMIT 1"
              ),
              rusqlite::params![owner_str, recipient],
              RawRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_stored).transpose()
  }

  async fn pending_requests(&self, owner_id: Uuid) -> Result<Vec<StoredRequest>> {
    let owner_str = encode_uuid(owner_id);

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM requests
           WHERE owner_id = ?1 AND direction = 'incoming' AND state = 'pending'
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_stored).collect()
  }
}
