//! The `PostStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bounty-store-sqlite`).
//! The lifecycle engine depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  post::{NewPost, Post, PostId, PostQuery, PostStatus},
  settlement::{NewSettlement, PendingSettlement, SettlementId},
  tag::{PostTag, Resolved, Tag, TagId},
  user::UserId,
};

/// Everything written by [`PostStore::create_post`].
#[derive(Debug, Clone)]
pub struct CreatedPost {
  pub post:     Post,
  /// Resolved tags in request order.
  pub tags:     Vec<Tag>,
  pub links:    Vec<PostTag>,
  /// How many of `tags` were inserted by this call.
  pub new_tags: usize,
}

/// Abstraction over a post store backend.
///
/// Every method that writes more than one row does so atomically: either all
/// rows are visible afterwards or none are. Each call gets its own unit of
/// work, so concurrent calls never share a transaction.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PostStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Posts ─────────────────────────────────────────────────────────────

  /// Insert a post, resolve each tag body (creating missing tags), and link
  /// them, all in one transaction. Any failure leaves no post, tag, or link
  /// from this call behind.
  fn create_post(
    &self,
    input: NewPost,
    tags: Vec<String>,
  ) -> impl Future<Output = Result<CreatedPost, Self::Error>> + Send + '_;

  /// Retrieve a post by ID. Returns `None` if not found.
  fn get_post(
    &self,
    id: PostId,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// List posts matching `query`, newest first.
  fn list_posts<'a>(
    &'a self,
    query: &'a PostQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  /// Replace the body of a post. Returns `None` if not found.
  fn update_body(
    &self,
    id: PostId,
    body: String,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Set or clear the helper of an [`PostStatus::Open`] post.
  ///
  /// Returns `None` if the post does not exist or is no longer open.
  fn set_helper(
    &self,
    id: PostId,
    helper: Option<UserId>,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Move a post from `from` to `to` and record the ledger delta the
  /// transition owes, in one transaction.
  ///
  /// The new settlement comes back claimed by the caller. Returns `None`
  /// without writing anything if the post does not exist or is no longer in
  /// `from`.
  fn settle(
    &self,
    id: PostId,
    from: PostStatus,
    to: PostStatus,
    entry: NewSettlement,
  ) -> impl Future<Output = Result<Option<(Post, PendingSettlement)>, Self::Error>>
  + Send
  + '_;

  /// Delete a post and its tag links. Returns `false` if not found.
  fn delete_post(
    &self,
    id: PostId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Sum of `point` over the user's posts still in [`PostStatus::Open`].
  fn scheduled_payment_total(
    &self,
    requester_id: UserId,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// Return the tag with this exact body, creating it if absent.
  fn resolve_tag<'a>(
    &'a self,
    body: &'a str,
  ) -> impl Future<Output = Result<Resolved, Self::Error>> + Send + 'a;

  fn get_tag(
    &self,
    id: TagId,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// Case-insensitive substring search over tag bodies.
  fn search_tags<'a>(
    &'a self,
    fragment: &'a str,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + 'a;

  /// Tags linked to a post, in store order.
  fn tags_for_post(
    &self,
    post_id: PostId,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  /// Delete a tag and its post links. Returns `false` if not found.
  fn delete_tag(
    &self,
    id: TagId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Settlements ───────────────────────────────────────────────────────

  /// All settlements not yet confirmed by the ledger, oldest first.
  fn pending_settlements(
    &self,
  ) -> impl Future<Output = Result<Vec<PendingSettlement>, Self::Error>> + Send + '_;

  /// Take the claim on a settlement if nobody holds it or the holder's claim
  /// predates `stale_before`. Returns `false` if the row is held or gone.
  fn claim_settlement(
    &self,
    id: SettlementId,
    stale_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Give up the claim on a settlement so a later pass may post it.
  fn release_settlement(
    &self,
    id: SettlementId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Drop every claim. Only safe while nothing is posting, i.e. at startup.
  fn release_all_settlements(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Mark a settlement confirmed. Returns `false` if it was already gone.
  fn clear_settlement(
    &self,
    id: SettlementId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
