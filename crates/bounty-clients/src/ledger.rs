use bounty_core::{
  client::{ClientError, LedgerClient, Service},
  user::UserId,
};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{decode, endpoint, expect_success, transport};

const SERVICE: Service = Service::Ledger;

/// `POST /points` request body.
#[derive(Debug, Serialize)]
struct PointEntry<'a> {
  user_id: UserId,
  number:  i64,
  comment: &'a str,
}

/// `GET /sum/{user_id}` response.
#[derive(Debug, Deserialize)]
struct SumResponse {
  total: i64,
}

#[derive(Debug, Clone)]
pub struct HttpLedger {
  client: Client,
  base:   Url,
}

impl HttpLedger {
  pub fn new(client: Client, base: Url) -> Self { Self { client, base } }
}

impl LedgerClient for HttpLedger {
  async fn post_delta(
    &self,
    user_id: UserId,
    amount: i64,
    comment: &str,
  ) -> Result<(), ClientError> {
    let url = endpoint(&self.base, &["points"]);
    let entry = PointEntry { user_id, number: amount, comment };
    let resp = self
      .client
      .post(url)
      .json(&entry)
      .send()
      .await
      .map_err(|e| transport(SERVICE, e))?;
    expect_success(SERVICE, resp).await?;
    debug!(user_id, amount, "posted ledger delta");
    Ok(())
  }

  async fn total_for(&self, user_id: UserId) -> Result<i64, ClientError> {
    let id = user_id.to_string();
    let url = endpoint(&self.base, &["sum", &id]);
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| transport(SERVICE, e))?;
    let sum: SumResponse = decode(SERVICE, resp).await?;
    Ok(sum.total)
  }
}
