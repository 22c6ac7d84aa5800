//! HTTP adapters for the identity and ledger services.
//!
//! Both adapters share one [`reqwest::Client`] configured with a bounded
//! per-request timeout. Every failure is decoded into a
//! [`ClientError`](bounty_core::client::ClientError); retries are the
//! caller's business.

mod identity;
mod ledger;

pub use identity::HttpIdentity;
pub use ledger::HttpLedger;

use std::time::Duration;

use bounty_core::client::{ClientError, Service};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while constructing the adapters.
#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {service} base URL {url:?}: {reason}")]
  InvalidUrl {
    service: Service,
    url:     String,
    reason:  String,
  },

  #[error("failed to build HTTP client: {0}")]
  Build(#[from] reqwest::Error),
}

/// Connection settings for both collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub identity_url: String,
  pub ledger_url:   String,
  pub timeout:      Duration,
}

/// Build both adapters over a shared connection pool.
pub fn connect(config: &ClientConfig) -> Result<(HttpIdentity, HttpLedger), Error> {
  let client = Client::builder().timeout(config.timeout).build()?;
  let identity = HttpIdentity::new(
    client.clone(),
    base_url(Service::Identity, &config.identity_url)?,
  );
  let ledger = HttpLedger::new(client, base_url(Service::Ledger, &config.ledger_url)?);
  Ok((identity, ledger))
}

// ─── URL handling ────────────────────────────────────────────────────────────

fn base_url(service: Service, raw: &str) -> Result<Url, Error> {
  let invalid = |reason: String| Error::InvalidUrl {
    service,
    url: raw.to_owned(),
    reason,
  };
  let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
  if url.cannot_be_a_base() {
    return Err(invalid("not a base URL".into()));
  }
  Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
  let mut url = base.clone();
  // `base_url` already rejected cannot-be-a-base URLs.
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url
}

// ─── Response decoding ───────────────────────────────────────────────────────

/// The `{"error": "..."}` body both services return on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

fn error_message(status: StatusCode, body: &str) -> String {
  if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
    return parsed.error;
  }
  let trimmed = body.trim();
  if trimmed.is_empty() {
    status.canonical_reason().unwrap_or("no reason given").to_owned()
  } else {
    trimmed.to_owned()
  }
}

/// Map a non-success response to a typed error.
///
/// Both services answer a bad token with 400; 401 and 403 mean the same.
fn classify(service: Service, status: StatusCode, body: &str) -> ClientError {
  let message = error_message(status, body);
  match status {
    StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
      ClientError::Unauthorized { service, message }
    }
    _ => ClientError::Status { service, status: status.as_u16(), message },
  }
}

/// Map a transport-level failure to a typed error.
fn transport(service: Service, e: reqwest::Error) -> ClientError {
  if e.is_timeout() {
    ClientError::Timeout { service }
  } else if e.is_connect() || e.is_builder() {
    ClientError::Unreachable { service, message: e.to_string() }
  } else if e.is_decode() {
    ClientError::Decode { service, message: e.to_string() }
  } else {
    ClientError::Interrupted { service, message: e.to_string() }
  }
}

/// Turn a response into `T`, or into a classified error.
async fn decode<T>(service: Service, resp: reqwest::Response) -> Result<T, ClientError>
where
  T: for<'de> Deserialize<'de>,
{
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(classify(service, status, &body));
  }
  let bytes = resp.bytes().await.map_err(|e| transport(service, e))?;
  serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
    service,
    message: e.to_string(),
  })
}

/// Like [`decode`] for endpoints whose success body is irrelevant.
async fn expect_success(
  service: Service,
  resp: reqwest::Response,
) -> Result<(), ClientError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(());
  }
  let body = resp.text().await.unwrap_or_default();
  Err(classify(service, status, &body))
}
