//! SQL schema for the Strand SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    person_id    TEXT PRIMARY KEY,
    guid         TEXT NOT NULL UNIQUE,
    guid_local   INTEGER NOT NULL DEFAULT 0,  -- 1 while the guid is one we made up
    handle       TEXT NOT NULL UNIQUE,  -- lowercase local@host
    public_key   TEXT,
    url          TEXT,
    profile_json TEXT,                  -- JSON-encoded Profile or NULL
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS aspects (
    aspect_id  TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (owner_id, person_id)
);

CREATE TABLE IF NOT EXISTS aspect_memberships (
    aspect_id  TEXT NOT NULL REFERENCES aspects(aspect_id)   ON DELETE CASCADE,
    contact_id TEXT NOT NULL REFERENCES contacts(contact_id) ON DELETE CASCADE,
    PRIMARY KEY (aspect_id, contact_id)
);

CREATE TABLE IF NOT EXISTS status_messages (
    guid       TEXT PRIMARY KEY,
    author     TEXT NOT NULL,
    message    TEXT NOT NULL,
    public     INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    guid       TEXT PRIMARY KEY,
    post_guid  TEXT NOT NULL REFERENCES status_messages(guid) ON DELETE CASCADE,
    author     TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_at TEXT
);

-- Which aspects a post has been shared into.
CREATE TABLE IF NOT EXISTS post_visibilities (
    aspect_id TEXT NOT NULL REFERENCES aspects(aspect_id)       ON DELETE CASCADE,
    post_guid TEXT NOT NULL REFERENCES status_messages(guid)    ON DELETE CASCADE,
    PRIMARY KEY (aspect_id, post_guid)
);

-- Each local participant tracks its own view of a handshake.
CREATE TABLE IF NOT EXISTS requests (
    owner_id     TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    guid         TEXT NOT NULL,
    sender       TEXT NOT NULL,
    sender_guid  TEXT,
    recipient    TEXT NOT NULL,
    callback_url TEXT,
    exported_key TEXT,
    direction    TEXT NOT NULL,   -- 'outgoing' | 'incoming'
    state        TEXT NOT NULL,   -- 'pending' | 'reversed' | 'accepted'
    aspect_id    TEXT REFERENCES aspects(aspect_id) ON DELETE SET NULL,
    created_at   TEXT NOT NULL,
    PRIMARY KEY (owner_id, guid)
);

CREATE INDEX IF NOT EXISTS comments_post_idx       ON comments(post_guid);
CREATE INDEX IF NOT EXISTS status_author_idx       ON status_messages(author);
CREATE INDEX IF NOT EXISTS memberships_contact_idx ON aspect_memberships(contact_id);

PRAGMA user_version = 2;
";
