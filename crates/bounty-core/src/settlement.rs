//! Pending settlements.
//!
//! A status transition that moves points is committed locally together with a
//! pending-settlement row describing the ledger delta. The row is removed once
//! the ledger has accepted the delta; rows left behind are re-posted by
//! reconciliation.
//!
//! Whoever posts a row to the ledger must hold its claim. A row is created
//! already claimed by the request that settled the post, and a claim is only
//! taken over once it is older than the claim lease.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{post::PostId, user::UserId};

pub type SettlementId = i64;

/// A signed point delta awaiting confirmation from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSettlement {
  pub id:         SettlementId,
  pub post_id:    PostId,
  /// The ledger account the delta is attributed to.
  pub user_id:    UserId,
  /// Negative debits the account, positive credits it.
  pub amount:     i64,
  pub comment:    String,
  pub created_at: DateTime<Utc>,
  /// When the current poster took the row; `None` while nobody holds it.
  pub claimed_at: Option<DateTime<Utc>>,
}

/// Input half of a [`PendingSettlement`]; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSettlement {
  pub user_id: UserId,
  pub amount:  i64,
  pub comment: String,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
  pub settled: usize,
  pub failed:  usize,
  /// Rows another poster still held.
  pub skipped: usize,
}
