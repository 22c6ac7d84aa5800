//! Handlers for `/posts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/posts` | Optional `requester_id`, `helper_id`, `status`, `tag_id`, `expand=tags` |
//! | `POST`   | `/posts` | Body: [`PostDraft`]; returns 201 + [`PostDetail`] |
//! | `GET`    | `/posts/{id}` | [`PostDetail`] |
//! | `PUT`    | `/posts/{id}` | Body: `{"body":"..."}`; requester only |
//! | `DELETE` | `/posts/{id}` | 204; requester only |
//! | `PUT`    | `/posts/{id}/helper` | Caller becomes the helper |
//! | `DELETE` | `/posts/{id}/helper` | Clears the helper |
//! | `POST`   | `/posts/{id}/payment` | `Open → Payment`, debits the requester |
//! | `POST`   | `/posts/{id}/acceptance` | `Payment → Acceptance`, credits the helper |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  post::{PostDraft, PostId, PostQuery, PostStatus},
  store::PostStore,
  tag::TagId,
  user::UserId,
};
use bounty_lifecycle::{PostDetail, PostView};
use serde::Deserialize;

use crate::{Bearer, Engine, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub requester_id: Option<UserId>,
  pub helper_id:    Option<UserId>,
  pub status:       Option<PostStatus>,
  pub tag_id:       Option<TagId>,
  /// `tags` to include each post's tags.
  pub expand:       Option<String>,
}

impl ListParams {
  fn query(&self) -> PostQuery {
    PostQuery {
      requester_id: self.requester_id,
      helper_id:    self.helper_id,
      status:       self.status,
      tag_id:       self.tag_id,
    }
  }

  fn expand_tags(&self) -> Result<bool, ApiError> {
    match self.expand.as_deref() {
      None | Some("") => Ok(false),
      Some("tags") => Ok(true),
      Some(other) => Err(ApiError::BadRequest(format!("cannot expand {other:?}"))),
    }
  }
}

/// `GET /posts[?requester_id=..][&helper_id=..][&status=..][&tag_id=..][&expand=tags]`
pub async fn list<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Query(params) = params?;
  let query = params.query();
  if params.expand_tags()? {
    let details: Vec<PostDetail> = engine.list_details(&query).await?;
    Ok(Json(details).into_response())
  } else {
    let views: Vec<PostView> = engine.list_views(&query).await?;
    Ok(Json(views).into_response())
  }
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /posts`, body `{"body":"...","point":100,"tags":["plumbing"]}`
pub async fn create<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  draft: Result<Json<PostDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Json(draft) = draft?;
  let detail = engine.create(draft, &token).await?;
  Ok((StatusCode::CREATED, Json(detail)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /posts/{id}`
pub async fn get_one<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<Json<PostDetail>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.get_detail(id).await?))
}

// ─── Edit / delete ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub body: String,
}

/// `PUT /posts/{id}`, body `{"body":"..."}`
pub async fn update<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
  body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<PostView>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  let Json(update) = body?;
  Ok(Json(engine.update_body(id, update.body, &token).await?))
}

/// `DELETE /posts/{id}`
pub async fn delete_one<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<StatusCode, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  engine.delete(id, &token).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Helper assignment ────────────────────────────────────────────────────────

/// `PUT /posts/{id}/helper`
pub async fn assign_helper<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<Json<PostView>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.assign_helper(id, &token).await?))
}

/// `DELETE /posts/{id}/helper`
pub async fn unassign_helper<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<Json<PostView>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.unassign_helper(id, &token).await?))
}

// ─── Settlement ───────────────────────────────────────────────────────────────

/// `POST /posts/{id}/payment`
pub async fn settle_payment<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<Json<PostView>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.settle_payment(id, &token).await?))
}

/// `POST /posts/{id}/acceptance`
pub async fn settle_acceptance<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<PostId>, PathRejection>,
) -> Result<Json<PostView>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.settle_acceptance(id, &token).await?))
}
