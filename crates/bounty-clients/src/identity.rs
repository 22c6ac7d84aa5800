use bounty_core::{
  client::{ClientError, IdentityClient, Service},
  user::{User, UserId},
};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{decode, endpoint, transport};

const SERVICE: Service = Service::Identity;

/// `GET /auth/{token}` response.
#[derive(Debug, Deserialize)]
struct AuthResponse {
  id: UserId,
}

#[derive(Debug, Clone)]
pub struct HttpIdentity {
  client: Client,
  base:   Url,
}

impl HttpIdentity {
  pub fn new(client: Client, base: Url) -> Self { Self { client, base } }
}

impl IdentityClient for HttpIdentity {
  async fn resolve_token(&self, token: &str) -> Result<UserId, ClientError> {
    let url = endpoint(&self.base, &["auth", token]);
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| transport(SERVICE, e))?;
    let auth: AuthResponse = decode(SERVICE, resp).await?;
    debug!(user_id = auth.id, "resolved caller token");
    Ok(auth.id)
  }

  async fn list_users(&self) -> Result<Vec<User>, ClientError> {
    let url = endpoint(&self.base, &["users"]);
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| transport(SERVICE, e))?;
    let users: Vec<User> = decode(SERVICE, resp).await?;
    debug!(count = users.len(), "fetched user directory");
    Ok(users)
  }
}
