//! Post types: the unit of work on the board.
//!
//! A post is a help request with a point bounty. Its `status` only ever moves
//! forward: `Open → Payment → Acceptance`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{Error, Result, tag::TagId, user::UserId};

/// Store-assigned post identifier.
pub type PostId = i64;

/// Largest accepted bounty. Keeps per-user point sums inside `i64`.
pub const MAX_POINT: i64 = i32::MAX as i64;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a post is in its settlement lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PostStatus {
  /// Accepting helpers; the bounty is pledged but not yet paid.
  #[default]
  Open,
  /// The requester has paid the bounty out of their balance.
  Payment,
  /// The helper has been credited. Terminal.
  Acceptance,
}

impl PostStatus {
  /// The single state that may follow this one, if any.
  pub fn next(self) -> Option<Self> {
    match self {
      Self::Open => Some(Self::Payment),
      Self::Payment => Some(Self::Acceptance),
      Self::Acceptance => None,
    }
  }

  pub fn can_transition_to(self, to: Self) -> bool { self.next() == Some(to) }

  pub fn is_terminal(self) -> bool { self.next().is_none() }
}

// ─── Post ────────────────────────────────────────────────────────────────────

/// A persisted help request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:           PostId,
  /// The user who created the post. Never zero once persisted.
  pub requester_id: UserId,
  /// The user who claimed the post, if any.
  pub helper_id:    Option<UserId>,
  pub body:         String,
  /// The bounty. In `0..=MAX_POINT` and fixed at creation.
  pub point:        i64,
  pub status:       PostStatus,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Post {
  pub fn has_helper(&self) -> bool { self.helper_id.is_some() }
}

// ─── NewPost ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::PostStore::create_post`].
///
/// `requester_id` is always taken from the authenticated caller; the status
/// always starts at [`PostStatus::Open`].
#[derive(Debug, Clone)]
pub struct NewPost {
  pub requester_id: UserId,
  pub body:         String,
  pub point:        i64,
}

/// What a caller submits when asking for help.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostDraft {
  pub body:  String,
  pub point: i64,
  #[serde(default)]
  pub tags:  Vec<String>,
}

impl PostDraft {
  /// Check the draft and normalise its tag list.
  ///
  /// Tag bodies are trimmed, and repeated bodies are collapsed while keeping
  /// first-seen order.
  pub fn validate(self) -> Result<(String, i64, Vec<String>)> {
    if self.point < 0 {
      return Err(Error::Validation(format!(
        "point must be non-negative, got {}",
        self.point
      )));
    }
    if self.point > MAX_POINT {
      return Err(Error::Validation(format!(
        "point must be at most {MAX_POINT}, got {}",
        self.point
      )));
    }
    if self.body.trim().is_empty() {
      return Err(Error::Validation("post body must not be empty".into()));
    }

    let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
    for raw in self.tags {
      let body = raw.trim();
      if body.is_empty() {
        return Err(Error::Validation("tag body must not be empty".into()));
      }
      if !tags.iter().any(|t| t == body) {
        tags.push(body.to_owned());
      }
    }

    Ok((self.body, self.point, tags))
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Filters for [`crate::store::PostStore::list_posts`]. All set fields must
/// match; results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostQuery {
  pub requester_id: Option<UserId>,
  pub helper_id:    Option<UserId>,
  pub status:       Option<PostStatus>,
  pub tag_id:       Option<TagId>,
}
