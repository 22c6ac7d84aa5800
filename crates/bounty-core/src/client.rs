//! Contracts for the external identity and ledger services.
//!
//! Both services are remote and non-transactional. Adapters decode every
//! response into either a value or a typed [`ClientError`]; nothing upstream
//! inspects raw response bodies.

use std::future::Future;

use strum::Display;
use thiserror::Error;

use crate::user::{User, UserId};

/// Which collaborator a [`ClientError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Service {
  Identity,
  Ledger,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
  /// The service rejected the token or credentials.
  #[error("{service} service rejected the request: {message}")]
  Unauthorized { service: Service, message: String },

  /// The request never reached the service (DNS, refused connection, ...).
  #[error("{service} service is unreachable: {message}")]
  Unreachable { service: Service, message: String },

  /// The request was sent but no response arrived in time. The service may
  /// or may not have acted on it.
  #[error("{service} service timed out")]
  Timeout { service: Service },

  /// The connection failed after the request was sent.
  #[error("{service} service connection was interrupted: {message}")]
  Interrupted { service: Service, message: String },

  #[error("{service} service returned {status}: {message}")]
  Status {
    service: Service,
    status:  u16,
    message: String,
  },

  #[error("{service} service sent an unreadable response: {message}")]
  Decode { service: Service, message: String },
}

impl ClientError {
  pub fn service(&self) -> Service {
    match self {
      Self::Unauthorized { service, .. }
      | Self::Unreachable { service, .. }
      | Self::Timeout { service }
      | Self::Interrupted { service, .. }
      | Self::Status { service, .. }
      | Self::Decode { service, .. } => *service,
    }
  }

  /// Whether the same call may succeed if repeated later.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::Unreachable { .. }
      | Self::Timeout { .. }
      | Self::Interrupted { .. } => true,
      Self::Status { status, .. } => *status >= 500,
      Self::Unauthorized { .. } | Self::Decode { .. } => false,
    }
  }

  /// Whether the service certainly never saw the request, so resending a
  /// non-idempotent call is safe.
  pub fn is_undelivered(&self) -> bool { matches!(self, Self::Unreachable { .. }) }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Resolves caller tokens and lists display identities.
pub trait IdentityClient: Send + Sync {
  /// Resolve an opaque caller token to a user ID.
  ///
  /// An invalid or expired token yields [`ClientError::Unauthorized`].
  fn resolve_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<UserId, ClientError>> + Send + 'a;

  /// Fetch the full user directory.
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, ClientError>> + Send + '_;
}

/// Records point deltas and reports balances.
pub trait LedgerClient: Send + Sync {
  /// Record a signed point delta against `user_id`.
  fn post_delta<'a>(
    &'a self,
    user_id: UserId,
    amount: i64,
    comment: &'a str,
  ) -> impl Future<Output = Result<(), ClientError>> + Send + 'a;

  /// Total points currently credited to `user_id`.
  fn total_for(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<i64, ClientError>> + Send + '_;
}
