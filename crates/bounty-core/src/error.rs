//! Error types for `bounty-core`.
//!
//! Every failure a caller can observe falls into one [`ErrorKind`]; the
//! variants of [`Error`] add the detail.

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::{
  client::ClientError,
  post::{PostId, PostStatus},
  tag::TagId,
};

/// A lifecycle rule that a well-formed request still violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
  #[error("post {0} has no helper assigned")]
  NoHelper(PostId),

  #[error("post {id} cannot move from {from} to {to}")]
  InvalidTransition {
    id:   PostId,
    from: PostStatus,
    to:   PostStatus,
  },

  #[error("post {id} is {status}; helpers can only change while it is open")]
  HelperLocked { id: PostId, status: PostStatus },

  #[error("only the requester may modify post {0}")]
  NotRequester(PostId),

  #[error("post {0} is awaiting acceptance and cannot be deleted")]
  SettlementInFlight(PostId),
}

#[derive(Debug, Error)]
pub enum Error {
  /// The caller's token was rejected or did not resolve to a user.
  #[error("unauthorized: {0}")]
  Auth(String),

  #[error("post not found: {0}")]
  PostNotFound(PostId),

  #[error("tag not found: {0}")]
  TagNotFound(TagId),

  #[error(transparent)]
  Domain(#[from] DomainError),

  #[error("invalid input: {0}")]
  Validation(String),

  /// The identity or ledger service was unreachable or refused the call.
  #[error("collaborator error: {0}")]
  Collaborator(#[from] ClientError),

  /// Persisted data violates an invariant (e.g. a post with no requester).
  #[error("data integrity error: {0}")]
  Data(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of an [`Error`], stable across variants.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  Auth,
  NotFound,
  Domain,
  Validation,
  Collaborator,
  Data,
  Store,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Auth(_) => ErrorKind::Auth,
      Self::PostNotFound(_) | Self::TagNotFound(_) => ErrorKind::NotFound,
      Self::Domain(_) => ErrorKind::Domain,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Collaborator(_) => ErrorKind::Collaborator,
      Self::Data(_) => ErrorKind::Data,
      Self::Store(_) => ErrorKind::Store,
    }
  }

  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether repeating the same request later may succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Collaborator(e) if e.is_transient())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
