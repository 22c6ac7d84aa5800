//! Server assembly for the bounty board: configuration and the HTTP stack.
//!
//! The binary in `main.rs` wires these together with a real store and the
//! HTTP collaborators.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  http::{Method, header},
};
use bounty_clients::ClientConfig;
use bounty_core::{
  client::{IdentityClient, LedgerClient},
  retry::RetryPolicy,
  store::PostStore,
};
use bounty_lifecycle::Lifecycle;
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BOUNTY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  pub identity_url:        String,
  pub ledger_url:          String,
  #[serde(default = "default_client_timeout_secs")]
  pub client_timeout_secs: u64,
  #[serde(default = "default_retry_max_attempts")]
  pub retry_max_attempts:  u32,
  #[serde(default = "default_retry_base_delay_ms")]
  pub retry_base_delay_ms: u64,
  #[serde(default = "default_retry_max_delay_ms")]
  pub retry_max_delay_ms:  u64,
  #[serde(default = "default_cors_allow_origins")]
  pub cors_allow_origins:  Vec<String>,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8090 }
fn default_store_path() -> PathBuf { PathBuf::from("bounty.sqlite3") }
fn default_client_timeout_secs() -> u64 { 10 }
fn default_retry_max_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 200 }
fn default_retry_max_delay_ms() -> u64 { 2000 }
fn default_cors_allow_origins() -> Vec<String> { vec!["*".into()] }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn client_config(&self) -> ClientConfig {
    ClientConfig {
      identity_url: self.identity_url.clone(),
      ledger_url:   self.ledger_url.clone(),
      timeout:      Duration::from_secs(self.client_timeout_secs),
    }
  }

  /// At least one attempt is always made.
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts: self.retry_max_attempts.max(1),
      base_delay:   Duration::from_millis(self.retry_base_delay_ms),
      max_delay:    Duration::from_millis(self.retry_max_delay_ms),
    }
  }

  /// CORS for the configured origins. `*` anywhere in the list allows all.
  pub fn cors_layer(&self) -> CorsLayer {
    let origin = if self.cors_allow_origins.iter().any(|o| o == "*") {
      AllowOrigin::any()
    } else {
      let origins: Vec<_> = self
        .cors_allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
      AllowOrigin::list(origins)
    };
    CorsLayer::new()
      .allow_origin(origin)
      .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
      .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
      .max_age(Duration::from_secs(3600))
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router wrapped in CORS and request tracing.
pub fn app<S, I, L>(engine: Arc<Lifecycle<S, I, L>>, config: &ServerConfig) -> Router
where
  S: PostStore + 'static,
  I: IdentityClient + 'static,
  L: LedgerClient + 'static,
{
  bounty_api::api_router(engine)
    .layer(config.cors_layer())
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn load(overrides: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    for (key, value) in overrides {
      builder = builder.set_override(*key, *value)?;
    }
    builder.build()?.try_deserialize()
  }

  #[test]
  fn defaults_fill_optional_keys() {
    let cfg = load(&[
      ("identity_url", "http://identity.local"),
      ("ledger_url", "http://ledger.local"),
    ])
    .unwrap();

    assert_eq!(cfg.address(), "0.0.0.0:8090");
    assert_eq!(cfg.store_path, PathBuf::from("bounty.sqlite3"));
    assert_eq!(cfg.cors_allow_origins, vec!["*".to_string()]);

    let retry = cfg.retry_policy();
    assert_eq!(retry.max_attempts, 3);
    assert_eq!(retry.base_delay, Duration::from_millis(200));
    assert_eq!(retry.max_delay, Duration::from_secs(2));
    assert_eq!(cfg.client_config().timeout, Duration::from_secs(10));
  }

  #[test]
  fn collaborator_urls_are_required() {
    assert!(load(&[("identity_url", "http://identity.local")]).is_err());
  }

  #[test]
  fn zero_attempts_still_tries_once() {
    let cfg = load(&[
      ("identity_url", "http://identity.local"),
      ("ledger_url", "http://ledger.local"),
      ("retry_max_attempts", "0"),
    ])
    .unwrap();
    assert_eq!(cfg.retry_policy().max_attempts, 1);
  }
}
