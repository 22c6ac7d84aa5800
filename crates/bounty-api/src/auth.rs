//! Caller token extraction.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use bounty_core::Error;

use crate::error::ApiError;

/// The opaque caller token from `Authorization: Bearer <token>`.
///
/// Only the presence of the token is checked here; the identity service
/// decides whether it is valid.
#[derive(Debug, Clone)]
pub struct Bearer(pub String);

pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
  let value = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| Error::Auth("missing bearer token".into()))?;

  let token = value
    .strip_prefix("Bearer ")
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| Error::Auth("malformed authorization header".into()))?;

  Ok(token.to_owned())
}

impl<S: Send + Sync> FromRequestParts<S> for Bearer {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    bearer_token(&parts.headers).map(Bearer)
  }
}
