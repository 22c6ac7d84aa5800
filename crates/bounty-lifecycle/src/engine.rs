//! The post lifecycle engine.
//!
//! Every mutating operation authenticates the caller token first. Settlement
//! operations commit the status change locally (together with a pending
//! settlement row) before the ledger is called; a ledger failure therefore
//! leaves the post in its new status and the delta queued for
//! [`Lifecycle::reconcile_pending`]. Only the holder of a settlement's claim
//! posts it, so a delta reaches the ledger at most once per claim.

use bounty_core::{
  DomainError, Error, Result,
  client::{ClientError, IdentityClient, LedgerClient},
  post::{NewPost, Post, PostDraft, PostId, PostQuery, PostStatus},
  retry::RetryPolicy,
  settlement::{NewSettlement, PendingSettlement, ReconcileReport},
  store::PostStore,
  tag::{Tag, TagId},
  user::{Directory, UserId},
};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::enrich::{
  PostDetail, PostView, PostWithTags, attach_identities, attach_identity,
  attach_tags,
};

/// How long a poster may hold a settlement before another pass takes it over.
const CLAIM_LEASE_SECS: i64 = 300;

fn collaborator(e: ClientError) -> Error {
  match e {
    ClientError::Unauthorized { message, .. } => Error::Auth(message),
    other => Error::Collaborator(other),
  }
}

pub struct Lifecycle<S, I, L> {
  store:       S,
  identity:    I,
  ledger:      L,
  retry:       RetryPolicy,
  /// Held for the length of a reconciliation pass.
  reconciling: Mutex<()>,
}

impl<S, I, L> Lifecycle<S, I, L>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  pub fn new(store: S, identity: I, ledger: L) -> Self {
    Self {
      store,
      identity,
      ledger,
      retry: RetryPolicy::default(),
      reconciling: Mutex::new(()),
    }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Collaborators ─────────────────────────────────────────────────────────

  /// Resolve the caller token to a user ID.
  pub async fn authenticate(&self, token: &str) -> Result<UserId> {
    if token.is_empty() {
      return Err(Error::Auth("missing caller token".into()));
    }
    let identity = &self.identity;
    let user_id = self
      .retry
      .run("resolve_token", ClientError::is_transient, move || {
        identity.resolve_token(token)
      })
      .await
      .map_err(collaborator)?;

    if user_id <= 0 {
      return Err(Error::Auth("token did not resolve to a user".into()));
    }
    Ok(user_id)
  }

  /// Fetch the identity directory once.
  pub async fn directory(&self) -> Result<Directory> {
    let identity = &self.identity;
    let users = self
      .retry
      .run("list_users", ClientError::is_transient, move || {
        identity.list_users()
      })
      .await
      .map_err(Error::Collaborator)?;
    Ok(users.into_iter().collect())
  }

  async fn load(&self, id: PostId) -> Result<Post> {
    self
      .store
      .get_post(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::PostNotFound(id))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get(&self, id: PostId) -> Result<Post> { self.load(id).await }

  pub async fn get_detail(&self, id: PostId) -> Result<PostDetail> {
    let post = self.load(id).await?;
    let directory = self.directory().await?;
    self.detail(post, &directory).await
  }

  pub async fn list(&self, query: &PostQuery) -> Result<Vec<Post>> {
    self.store.list_posts(query).await.map_err(Error::store)
  }

  pub async fn list_views(&self, query: &PostQuery) -> Result<Vec<PostView>> {
    let posts = self.list(query).await?;
    self.with_identities(posts).await
  }

  pub async fn list_details(&self, query: &PostQuery) -> Result<Vec<PostDetail>> {
    let posts = self.list(query).await?;
    let directory = self.directory().await?;
    let mut out = Vec::with_capacity(posts.len());
    for post in posts {
      out.push(self.detail(post, &directory).await?);
    }
    Ok(out)
  }

  pub async fn list_with_tags(&self, query: &PostQuery) -> Result<Vec<PostWithTags>> {
    let posts = self.list(query).await?;
    attach_tags(&self.store, posts).await
  }

  /// Posts linked to a tag, with identities.
  pub async fn posts_by_tag(&self, tag_id: TagId) -> Result<Vec<PostView>> {
    self
      .store
      .get_tag(tag_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::TagNotFound(tag_id))?;

    let query = PostQuery { tag_id: Some(tag_id), ..Default::default() };
    self.list_views(&query).await
  }

  /// Decorate posts with identities, fetching the directory once.
  pub async fn with_identities(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
    if posts.is_empty() {
      return Ok(Vec::new());
    }
    let directory = self.directory().await?;
    attach_identities(posts, &directory)
  }

  async fn detail(&self, post: Post, directory: &Directory) -> Result<PostDetail> {
    let tags = self.store.tags_for_post(post.id).await.map_err(Error::store)?;
    Ok(attach_identity(post, directory)?.with_tags(tags))
  }

  pub async fn search_tags(&self, fragment: &str) -> Result<Vec<Tag>> {
    self.store.search_tags(fragment).await.map_err(Error::store)
  }

  // ── Creation and edits ────────────────────────────────────────────────────

  /// Create a post owned by the caller, with its tags, atomically.
  pub async fn create(&self, draft: PostDraft, token: &str) -> Result<PostDetail> {
    let (body, point, tags) = draft.validate()?;
    let requester_id = self.authenticate(token).await?;
    // Fetched before the commit so a directory failure writes nothing.
    let directory = self.directory().await?;

    let created = self
      .store
      .create_post(NewPost { requester_id, body, point }, tags)
      .await
      .map_err(Error::store)?;
    info!(
      post_id = created.post.id,
      requester_id,
      point,
      tags = created.tags.len(),
      new_tags = created.new_tags,
      "post created"
    );

    Ok(attach_identity(created.post, &directory)?.with_tags(created.tags))
  }

  /// Replace the body of one of the caller's posts.
  pub async fn update_body(
    &self,
    id: PostId,
    body: String,
    token: &str,
  ) -> Result<PostView> {
    if body.trim().is_empty() {
      return Err(Error::Validation("post body must not be empty".into()));
    }
    let caller = self.authenticate(token).await?;
    let post = self.load(id).await?;
    if post.requester_id != caller {
      return Err(DomainError::NotRequester(id).into());
    }

    let post = self
      .store
      .update_body(id, body)
      .await
      .map_err(Error::store)?
      .ok_or(Error::PostNotFound(id))?;
    self.view(post).await
  }

  /// Delete one of the caller's posts and its tag links.
  pub async fn delete(&self, id: PostId, token: &str) -> Result<()> {
    let caller = self.authenticate(token).await?;
    let post = self.load(id).await?;
    if post.requester_id != caller {
      return Err(DomainError::NotRequester(id).into());
    }
    if post.status == PostStatus::Payment {
      return Err(DomainError::SettlementInFlight(id).into());
    }

    if !self.store.delete_post(id).await.map_err(Error::store)? {
      return Err(Error::PostNotFound(id));
    }
    info!(post_id = id, "post deleted");
    Ok(())
  }

  /// Delete a tag; links to it disappear with it.
  pub async fn delete_tag(&self, id: TagId, token: &str) -> Result<()> {
    self.authenticate(token).await?;
    if !self.store.delete_tag(id).await.map_err(Error::store)? {
      return Err(Error::TagNotFound(id));
    }
    info!(tag_id = id, "tag deleted");
    Ok(())
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Make the caller the helper of an open post.
  pub async fn assign_helper(&self, id: PostId, token: &str) -> Result<PostView> {
    let caller = self.authenticate(token).await?;
    let post = self.change_helper(id, Some(caller)).await?;
    info!(post_id = id, helper_id = caller, "helper assigned");
    self.view(post).await
  }

  /// Clear the helper of an open post.
  pub async fn unassign_helper(&self, id: PostId, token: &str) -> Result<PostView> {
    self.authenticate(token).await?;
    let post = self.change_helper(id, None).await?;
    info!(post_id = id, "helper unassigned");
    self.view(post).await
  }

  async fn change_helper(&self, id: PostId, helper: Option<UserId>) -> Result<Post> {
    let post = self.load(id).await?;
    if post.status != PostStatus::Open {
      return Err(DomainError::HelperLocked { id, status: post.status }.into());
    }

    match self.store.set_helper(id, helper).await.map_err(Error::store)? {
      Some(post) => Ok(post),
      // Deleted or settled since the load.
      None => {
        let post = self.load(id).await?;
        Err(DomainError::HelperLocked { id, status: post.status }.into())
      }
    }
  }

  // ── Settlement ────────────────────────────────────────────────────────────

  /// `Open → Payment`: debit the requester by the bounty.
  pub async fn settle_payment(&self, id: PostId, token: &str) -> Result<PostView> {
    self.authenticate(token).await?;
    let post = self.load(id).await?;

    let helper_id = post.helper_id.ok_or(DomainError::NoHelper(id))?;
    self.require_transition(&post, PostStatus::Payment)?;

    let directory = self.directory().await?;
    let entry = NewSettlement {
      user_id: post.requester_id,
      amount:  -post.point,
      comment: format!(
        "{} helped you with post #{id}",
        directory.display_name(helper_id)
      ),
    };

    self.settle(post, PostStatus::Payment, entry, &directory).await
  }

  /// `Payment → Acceptance`: credit the helper with the bounty.
  pub async fn settle_acceptance(&self, id: PostId, token: &str) -> Result<PostView> {
    self.authenticate(token).await?;
    let post = self.load(id).await?;

    self.require_transition(&post, PostStatus::Acceptance)?;
    let helper_id = post.helper_id.ok_or_else(|| {
      Error::Data(format!("post {id} reached payment without a helper"))
    })?;

    let directory = self.directory().await?;
    let entry = NewSettlement {
      user_id: helper_id,
      amount:  post.point,
      comment: format!(
        "You helped {} with post #{id}",
        directory.display_name(post.requester_id)
      ),
    };

    self.settle(post, PostStatus::Acceptance, entry, &directory).await
  }

  fn require_transition(&self, post: &Post, to: PostStatus) -> Result<()> {
    if post.status.can_transition_to(to) {
      return Ok(());
    }
    Err(
      DomainError::InvalidTransition { id: post.id, from: post.status, to }
        .into(),
    )
  }

  async fn settle(
    &self,
    post: Post,
    to: PostStatus,
    entry: NewSettlement,
    directory: &Directory,
  ) -> Result<PostView> {
    let from = post.status;
    let (post, pending) = match self
      .store
      .settle(post.id, from, to, entry)
      .await
      .map_err(Error::store)?
    {
      Some(settled) => settled,
      // Another request moved the post first.
      None => {
        let current = self.load(post.id).await?;
        return Err(
          DomainError::InvalidTransition { id: post.id, from: current.status, to }
            .into(),
        );
      }
    };
    info!(post_id = post.id, %from, %to, "post status committed");

    self.post_settlement(&pending).await?;
    attach_identity(post, directory)
  }

  /// Send a claimed pending delta to the ledger and clear it on success.
  ///
  /// The caller must hold the claim on `pending`. A failed posting releases
  /// the claim so a later pass can retry it.
  async fn post_settlement(&self, pending: &PendingSettlement) -> Result<()> {
    let ledger = &self.ledger;
    let comment = pending.comment.as_str();
    let (user_id, amount) = (pending.user_id, pending.amount);

    // A timed-out posting may have landed; only resend undelivered ones.
    let posted = self
      .retry
      .run("post_delta", ClientError::is_undelivered, move || {
        ledger.post_delta(user_id, amount, comment)
      })
      .await;

    if let Err(e) = posted {
      warn!(
        settlement_id = pending.id,
        post_id = pending.post_id,
        user_id,
        amount,
        error = %e,
        "ledger posting failed; settlement left pending"
      );
      if let Err(release) = self.store.release_settlement(pending.id).await {
        warn!(
          settlement_id = pending.id,
          error = %release,
          "could not release settlement claim; it frees up when the lease lapses"
        );
      }
      return Err(Error::Collaborator(e));
    }

    // The ledger already has the delta: a failed clear is logged, not returned.
    match self.store.clear_settlement(pending.id).await {
      Ok(_) => info!(
        settlement_id = pending.id,
        post_id = pending.post_id,
        user_id,
        amount,
        "ledger delta posted"
      ),
      Err(e) => error!(
        settlement_id = pending.id,
        post_id = pending.post_id,
        user_id,
        amount,
        error = %e,
        "ledger delta posted but the pending row could not be cleared"
      ),
    }
    Ok(())
  }

  /// Re-post every unclaimed pending settlement at least `min_age` old.
  ///
  /// Passes run one at a time. A row still claimed by the request that
  /// created it, or by another poster within the claim lease, is skipped.
  pub async fn reconcile_pending(&self, min_age: Duration) -> Result<ReconcileReport> {
    let _pass = self.reconciling.lock().await;
    self.reconcile_locked(min_age).await
  }

  /// Release every claim left by a previous process, then reconcile
  /// everything. Call only before serving requests.
  pub async fn recover_pending(&self) -> Result<ReconcileReport> {
    let _pass = self.reconciling.lock().await;
    let released = self
      .store
      .release_all_settlements()
      .await
      .map_err(Error::store)?;
    if released > 0 {
      info!(released, "released stale settlement claims");
    }
    self.reconcile_locked(Duration::zero()).await
  }

  async fn reconcile_locked(&self, min_age: Duration) -> Result<ReconcileReport> {
    let now = Utc::now();
    let cutoff = now - min_age;
    let stale_before = now - Duration::seconds(CLAIM_LEASE_SECS);
    let pending = self.store.pending_settlements().await.map_err(Error::store)?;

    let mut report = ReconcileReport::default();
    for entry in pending.iter().filter(|p| p.created_at <= cutoff) {
      let claimed = self
        .store
        .claim_settlement(entry.id, stale_before)
        .await
        .map_err(Error::store)?;
      if !claimed {
        report.skipped += 1;
        continue;
      }
      match self.post_settlement(entry).await {
        Ok(()) => report.settled += 1,
        Err(Error::Collaborator(_)) => report.failed += 1,
        Err(e) => return Err(e),
      }
    }
    if report.settled + report.failed + report.skipped > 0 {
      info!(
        settled = report.settled,
        failed = report.failed,
        skipped = report.skipped,
        "reconciled settlements"
      );
    }
    Ok(report)
  }

  // ── Accounting ────────────────────────────────────────────────────────────

  /// Ledger balance minus points pledged to the user's still-open posts.
  pub async fn amount_payable(&self, user_id: UserId) -> Result<i64> {
    if user_id <= 0 {
      return Err(Error::Validation(format!("invalid user id {user_id}")));
    }
    let ledger = &self.ledger;
    let balance = self
      .retry
      .run("total_for", ClientError::is_transient, move || {
        ledger.total_for(user_id)
      })
      .await
      .map_err(Error::Collaborator)?;

    let scheduled = self
      .store
      .scheduled_payment_total(user_id)
      .await
      .map_err(Error::store)?;

    balance.checked_sub(scheduled).ok_or_else(|| {
      Error::Data(format!(
        "amount payable for user {user_id} overflows: {balance} - {scheduled}"
      ))
    })
  }

  async fn view(&self, post: Post) -> Result<PostView> {
    let directory = self.directory().await?;
    attach_identity(post, &directory)
  }
}
