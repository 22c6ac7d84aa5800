//! Handlers for `/tags` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/tags` | `?q=<fragment>`, case-insensitive substring |
//! | `GET`    | `/tags/{id}/posts` | Posts carrying the tag, with identities |
//! | `DELETE` | `/tags/{id}` | 204; links to the tag are removed |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
  http::StatusCode,
};
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  store::PostStore,
  tag::{Tag, TagId},
};
use bounty_lifecycle::PostView;
use serde::Deserialize;

use crate::{Bearer, Engine, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q: String,
}

/// `GET /tags?q=<fragment>`
pub async fn search<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Tag>>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Query(params) = params?;
  Ok(Json(engine.search_tags(params.q.trim()).await?))
}

/// `GET /tags/{id}/posts`
pub async fn posts<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  id: Result<Path<TagId>, PathRejection>,
) -> Result<Json<Vec<PostView>>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  Ok(Json(engine.posts_by_tag(id).await?))
}

/// `DELETE /tags/{id}`
pub async fn delete_one<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  id: Result<Path<TagId>, PathRejection>,
) -> Result<StatusCode, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(id) = id?;
  engine.delete_tag(id, &token).await?;
  Ok(StatusCode::NO_CONTENT)
}
