//! `GET /users/{id}/amount-payable`

use axum::{
  Json,
  extract::{Path, State, rejection::PathRejection},
};
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  store::PostStore,
  user::UserId,
};
use serde::Serialize;

use crate::{Engine, error::ApiError};

#[derive(Debug, Serialize)]
pub struct AmountPayable {
  pub user_id: UserId,
  pub amount:  i64,
}

/// Ledger balance less the points pledged to the user's open posts.
pub async fn amount_payable<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  user_id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<AmountPayable>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Path(user_id) = user_id?;
  let amount = engine.amount_payable(user_id).await?;
  Ok(Json(AmountPayable { user_id, amount }))
}
