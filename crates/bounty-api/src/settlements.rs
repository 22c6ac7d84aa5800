//! `POST /settlements/reconcile[?min_age_secs=N]`
//!
//! Re-posts ledger deltas whose first attempt failed. Entries younger than
//! `min_age_secs` (default 60) are left alone, and entries another poster
//! still holds are counted as `skipped`.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  settlement::ReconcileReport,
  store::PostStore,
};
use chrono::Duration;
use serde::Deserialize;

use crate::{Bearer, Engine, error::ApiError};

const DEFAULT_MIN_AGE_SECS: u32 = 60;

#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
  pub min_age_secs: Option<u32>,
}

pub async fn reconcile<S, I, L>(
  State(engine): State<Engine<S, I, L>>,
  Bearer(token): Bearer,
  params: Result<Query<ReconcileParams>, QueryRejection>,
) -> Result<Json<ReconcileReport>, ApiError>
where
  S: PostStore,
  I: IdentityClient,
  L: LedgerClient,
{
  let Query(params) = params?;
  engine.authenticate(&token).await?;
  let min_age = params.min_age_secs.unwrap_or(DEFAULT_MIN_AGE_SECS);
  let report = engine
    .reconcile_pending(Duration::seconds(i64::from(min_age)))
    .await?;
  Ok(Json(report))
}
