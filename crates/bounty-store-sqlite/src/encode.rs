//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings and statuses as
//! their lowercase names. Rows are first read into `Raw*` structs inside the
//! database thread and decoded afterwards.

use std::str::FromStr;

use bounty_core::{
  post::{Post, PostStatus},
  settlement::PendingSettlement,
  tag::Tag,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width, so column text sorts in time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── PostStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: PostStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<PostStatus> {
  PostStatus::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown post status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPost::from_row`].
pub const POST_COLUMNS: &str = "p.id, p.requester_id, p.helper_id, p.body, \
                                p.point, p.status, p.created_at, p.updated_at";

/// Raw values read directly from a `posts` row.
pub struct RawPost {
  pub id:           i64,
  pub requester_id: i64,
  pub helper_id:    Option<i64>,
  pub body:         String,
  pub point:        i64,
  pub status:       String,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawPost {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      requester_id: row.get(1)?,
      helper_id:    row.get(2)?,
      body:         row.get(3)?,
      point:        row.get(4)?,
      status:       row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:           self.id,
      requester_id: self.requester_id,
      helper_id:    self.helper_id,
      body:         self.body,
      point:        self.point,
      status:       decode_status(&self.status)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
  Ok(Tag { id: row.get(0)?, body: row.get(1)? })
}

/// Column list matching [`RawSettlement::from_row`].
pub const SETTLEMENT_COLUMNS: &str =
  "id, post_id, user_id, amount, comment, created_at, claimed_at";

/// Raw values read directly from a `pending_settlements` row.
pub struct RawSettlement {
  pub id:         i64,
  pub post_id:    i64,
  pub user_id:    i64,
  pub amount:     i64,
  pub comment:    String,
  pub created_at: String,
  pub claimed_at: Option<String>,
}

impl RawSettlement {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      post_id:    row.get(1)?,
      user_id:    row.get(2)?,
      amount:     row.get(3)?,
      comment:    row.get(4)?,
      created_at: row.get(5)?,
      claimed_at: row.get(6)?,
    })
  }

  pub fn into_settlement(self) -> Result<PendingSettlement> {
    Ok(PendingSettlement {
      id:         self.id,
      post_id:    self.post_id,
      user_id:    self.user_id,
      amount:     self.amount,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
      claimed_at: self.claimed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Escape `%`, `_` and `\` so a fragment matches literally under
/// `LIKE ... ESCAPE '\'`.
pub fn like_pattern(fragment: &str) -> String {
  let mut out = String::with_capacity(fragment.len() + 2);
  out.push('%');
  for c in fragment.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}
