//! [`SqliteStore`], the SQLite implementation of [`PostStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use bounty_core::{
  post::{NewPost, Post, PostId, PostQuery, PostStatus},
  settlement::{NewSettlement, PendingSettlement, SettlementId},
  store::{CreatedPost, PostStore},
  tag::{self, PostTag, Resolved, Tag, TagId, TagRepository},
  user::UserId,
};

use crate::{
  encode::{
    POST_COLUMNS, RawPost, RawSettlement, SETTLEMENT_COLUMNS, encode_dt,
    encode_status, like_pattern, tag_from_row,
  },
  schema::SCHEMA,
  Result,
};

// ─── Tag access inside a transaction ─────────────────────────────────────────

/// [`TagRepository`] over an open connection or transaction.
struct SqlTags<'c> {
  conn: &'c rusqlite::Connection,
}

impl TagRepository for SqlTags<'_> {
  type Error = rusqlite::Error;

  fn find_by_body(&mut self, body: &str) -> rusqlite::Result<Option<Tag>> {
    self
      .conn
      .query_row(
        "SELECT id, body FROM tags WHERE body = ?1",
        [body],
        tag_from_row,
      )
      .optional()
  }

  fn insert(&mut self, body: &str) -> rusqlite::Result<Tag> {
    // A row inserted by another writer since the lookup wins; the no-op
    // update makes RETURNING yield it instead of raising a conflict.
    self.conn.query_row(
      "INSERT INTO tags (body) VALUES (?1)
       ON CONFLICT(body) DO UPDATE SET body = excluded.body
       RETURNING id, body",
      [body],
      tag_from_row,
    )
  }
}

fn select_post(
  conn: &rusqlite::Connection,
  id: PostId,
) -> rusqlite::Result<Option<RawPost>> {
  conn
    .query_row(
      &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
      [id],
      RawPost::from_row,
    )
    .optional()
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bounty store backed by a single SQLite file.
///
/// Clones share one background connection.
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

  #[cfg(test)]
  pub(crate) async fn count_rows(&self, table: &'static str) -> i64 {
    self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
          r.get(0)
        })?)
      })
      .await
      .expect("count rows")
  }

  /// Insert a tag without looking it up first, as a writer that lost the
  /// race between lookup and insert would.
  #[cfg(test)]
  pub(crate) async fn insert_tag_unchecked(&self, body: &str) -> Tag {
    let body = body.to_owned();
    self
      .conn
      .call(move |conn| Ok(SqlTags { conn }.insert(&body)?))
      .await
      .expect("insert tag")
  }
}

// ─── PostStore impl ──────────────────────────────────────────────────────────

impl PostStore for SqliteStore {
  type Error = crate::Error;

  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn create_post(
    &self,
    input: NewPost,
    tags: Vec<String>,
  ) -> Result<CreatedPost> {
    let now = encode_dt(Utc::now());

    let (raw, resolved, new_tags) = self
      .conn
      .call(move |conn| {
        // Dropping `tx` on any early return rolls everything back.
        let tx = conn.transaction()?;

        let post_id: i64 = tx.query_row(
          "INSERT INTO posts (requester_id, helper_id, body, point, status,
                              created_at, updated_at)
           VALUES (?1, NULL, ?2, ?3, 'open', ?4, ?4)
           RETURNING id",
          rusqlite::params![input.requester_id, input.body, input.point, now],
          |r| r.get(0),
        )?;

        let mut resolved: Vec<Tag> = Vec::with_capacity(tags.len());
        let mut new_tags = 0;
        let mut repo = SqlTags { conn: &tx };
        for body in &tags {
          let Resolved { tag, created } = tag::resolve(&mut repo, body)?;
          if created {
            new_tags += 1;
          }
          tx.execute(
            "INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            rusqlite::params![post_id, tag.id],
          )?;
          resolved.push(tag);
        }

        let raw = tx.query_row(
          &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
          [post_id],
          RawPost::from_row,
        )?;

        tx.commit()?;
        Ok((raw, resolved, new_tags))
      })
      .await?;

    let post = raw.into_post()?;
    let links = resolved
      .iter()
      .map(|t| PostTag { post_id: post.id, tag_id: t.id })
      .collect();
    debug!(post_id = post.id, tags = resolved.len(), new_tags, "inserted post");

    Ok(CreatedPost { post, tags: resolved, links, new_tags })
  }

  async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_post(conn, id)?))
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
    let requester_id = query.requester_id;
    let helper_id    = query.helper_id;
    let status       = query.status.map(encode_status);
    let tag_id       = query.tag_id;

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {POST_COLUMNS}
           FROM posts p
           WHERE (?1 IS NULL OR p.requester_id = ?1)
             AND (?2 IS NULL OR p.helper_id    = ?2)
             AND (?3 IS NULL OR p.status       = ?3)
             AND (?4 IS NULL OR EXISTS (
                   SELECT 1 FROM post_tags pt
                   WHERE pt.post_id = p.id AND pt.tag_id = ?4))
           ORDER BY p.id DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![requester_id, helper_id, status, tag_id],
            RawPost::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn update_body(&self, id: PostId, body: String) -> Result<Option<Post>> {
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE posts SET body = ?1, updated_at = ?2 WHERE id = ?3",
          rusqlite::params![body, now, id],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_post(conn, id)?)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn set_helper(
    &self,
    id: PostId,
    helper: Option<UserId>,
  ) -> Result<Option<Post>> {
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE posts SET helper_id = ?1, updated_at = ?2
           WHERE id = ?3 AND status = 'open'",
          rusqlite::params![helper, now, id],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_post(conn, id)?)
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn settle(
    &self,
    id: PostId,
    from: PostStatus,
    to: PostStatus,
    entry: NewSettlement,
  ) -> Result<Option<(Post, PendingSettlement)>> {
    let now    = encode_dt(Utc::now());
    let from_s = encode_status(from);
    let to_s   = encode_status(to);

    let raws = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = tx.execute(
          "UPDATE posts SET status = ?1, updated_at = ?2
           WHERE id = ?3 AND status = ?4",
          rusqlite::params![to_s, now, id, from_s],
        )?;
        if changed == 0 {
          return Ok(None);
        }

        // The settling request holds the claim until it has posted.
        let settlement = tx.query_row(
          &format!(
            "INSERT INTO pending_settlements
               (post_id, user_id, amount, comment, created_at, claimed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {SETTLEMENT_COLUMNS}"
          ),
          rusqlite::params![id, entry.user_id, entry.amount, entry.comment, now],
          RawSettlement::from_row,
        )?;

        let post = tx.query_row(
          &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1"),
          [id],
          RawPost::from_row,
        )?;

        tx.commit()?;
        Ok(Some((post, settlement)))
      })
      .await?;

    raws
      .map(|(post, settlement)| -> Result<_> {
        Ok((post.into_post()?, settlement.into_settlement()?))
      })
      .transpose()
  }

  async fn delete_post(&self, id: PostId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM posts WHERE id = ?1", [id])?))
      .await?;
    Ok(changed > 0)
  }

  async fn scheduled_payment_total(&self, requester_id: UserId) -> Result<i64> {
    let total = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(SUM(point), 0) FROM posts
           WHERE requester_id = ?1 AND status = 'open'",
          [requester_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(total)
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn resolve_tag(&self, body: &str) -> Result<Resolved> {
    let body = body.to_owned();

    let resolved = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let resolved = tag::resolve(&mut SqlTags { conn: &tx }, &body)?;
        tx.commit()?;
        Ok(resolved)
      })
      .await?;
    Ok(resolved)
  }

  async fn get_tag(&self, id: TagId) -> Result<Option<Tag>> {
    let tag = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT id, body FROM tags WHERE id = ?1", [id], tag_from_row)
            .optional()?,
        )
      })
      .await?;
    Ok(tag)
  }

  async fn search_tags(&self, fragment: &str) -> Result<Vec<Tag>> {
    let pattern = like_pattern(fragment);

    let tags = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, body FROM tags WHERE body LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let rows = stmt
          .query_map([pattern], tag_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tags)
  }

  async fn tags_for_post(&self, post_id: PostId) -> Result<Vec<Tag>> {
    let tags = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.id, t.body
           FROM tags t
           INNER JOIN post_tags pt ON pt.tag_id = t.id
           WHERE pt.post_id = ?1",
        )?;
        let rows = stmt
          .query_map([post_id], tag_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(tags)
  }

  async fn delete_tag(&self, id: TagId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM tags WHERE id = ?1", [id])?))
      .await?;
    Ok(changed > 0)
  }

  // ── Settlements ───────────────────────────────────────────────────────────

  async fn pending_settlements(&self) -> Result<Vec<PendingSettlement>> {
    let raws: Vec<RawSettlement> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SETTLEMENT_COLUMNS} FROM pending_settlements ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawSettlement::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSettlement::into_settlement).collect()
  }

  async fn claim_settlement(
    &self,
    id: SettlementId,
    stale_before: DateTime<Utc>,
  ) -> Result<bool> {
    let now = encode_dt(Utc::now());
    let stale_before = encode_dt(stale_before);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE pending_settlements SET claimed_at = ?1
           WHERE id = ?2 AND (claimed_at IS NULL OR claimed_at < ?3)",
          rusqlite::params![now, id, stale_before],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn release_settlement(&self, id: SettlementId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE pending_settlements SET claimed_at = NULL WHERE id = ?1",
          [id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn release_all_settlements(&self) -> Result<usize> {
    let released = self
      .conn
      .call(|conn| {
        Ok(conn.execute(
          "UPDATE pending_settlements SET claimed_at = NULL
           WHERE claimed_at IS NOT NULL",
          [],
        )?)
      })
      .await?;
    Ok(released)
  }

  async fn clear_settlement(&self, id: SettlementId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM pending_settlements WHERE id = ?1", [id])?)
      })
      .await?;
    Ok(changed > 0)
  }
}
