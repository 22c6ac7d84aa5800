//! SQL schema for the bounty SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS posts (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    requester_id INTEGER NOT NULL CHECK (requester_id <> 0),
    helper_id    INTEGER CHECK (helper_id IS NULL OR helper_id <> 0),
    body         TEXT    NOT NULL,
    point        INTEGER NOT NULL CHECK (point BETWEEN 0 AND 2147483647),
    status       TEXT    NOT NULL DEFAULT 'open'
                 CHECK (status IN ('open', 'payment', 'acceptance')),
    created_at   TEXT    NOT NULL,   -- RFC 3339 UTC
    updated_at   TEXT    NOT NULL,
    -- A post leaves 'open' only with a helper attached.
    CHECK (status = 'open' OR helper_id IS NOT NULL)
);

-- Bodies compare with BINARY collation, i.e. case-sensitively.
CREATE TABLE IF NOT EXISTS tags (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    body TEXT    NOT NULL UNIQUE CHECK (length(body) > 0)
);

CREATE TABLE IF NOT EXISTS post_tags (
    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    tag_id  INTEGER NOT NULL REFERENCES tags(id)  ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);

-- Ledger deltas committed locally but not yet confirmed by the ledger.
-- No foreign key: a deleted post may still owe a delta.
CREATE TABLE IF NOT EXISTS pending_settlements (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id    INTEGER NOT NULL,
    user_id    INTEGER NOT NULL,
    amount     INTEGER NOT NULL,
    comment    TEXT    NOT NULL,
    created_at TEXT    NOT NULL,
    -- Set while a poster owns the row; NULL once released.
    claimed_at TEXT
);

CREATE INDEX IF NOT EXISTS posts_requester_idx ON posts(requester_id, status);
CREATE INDEX IF NOT EXISTS posts_helper_idx    ON posts(helper_id);
CREATE INDEX IF NOT EXISTS post_tags_tag_idx   ON post_tags(tag_id);

PRAGMA user_version = 1;
";
