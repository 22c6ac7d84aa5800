//! JSON REST API for the bounty board.
//!
//! Exposes an axum [`Router`] backed by a [`Lifecycle`] engine. Callers
//! authenticate with `Authorization: Bearer <token>`; the token is passed
//! through to the identity service untouched. TLS, CORS, and request logging
//! are the embedding server's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bounty_api::api_router(engine.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod posts;
pub mod settlements;
pub mod tags;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  store::PostStore,
};
use bounty_lifecycle::Lifecycle;

pub use auth::Bearer;
pub use error::ApiError;

/// Handler state: the shared engine.
pub type Engine<S, I, L> = Arc<Lifecycle<S, I, L>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, I, L>(engine: Engine<S, I, L>) -> Router<()>
where
  S: PostStore + 'static,
  I: IdentityClient + 'static,
  L: LedgerClient + 'static,
{
  Router::new()
    // Posts
    .route("/posts", get(posts::list::<S, I, L>).post(posts::create::<S, I, L>))
    .route(
      "/posts/{id}",
      get(posts::get_one::<S, I, L>)
        .put(posts::update::<S, I, L>)
        .delete(posts::delete_one::<S, I, L>),
    )
    .route(
      "/posts/{id}/helper",
      put(posts::assign_helper::<S, I, L>).delete(posts::unassign_helper::<S, I, L>),
    )
    .route("/posts/{id}/payment", post(posts::settle_payment::<S, I, L>))
    .route("/posts/{id}/acceptance", post(posts::settle_acceptance::<S, I, L>))
    // Accounting
    .route("/users/{id}/amount-payable", get(users::amount_payable::<S, I, L>))
    // Tags
    .route("/tags", get(tags::search::<S, I, L>))
    .route("/tags/{id}", axum::routing::delete(tags::delete_one::<S, I, L>))
    .route("/tags/{id}/posts", get(tags::posts::<S, I, L>))
    // Settlements
    .route("/settlements/reconcile", post(settlements::reconcile::<S, I, L>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
