//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use bounty_core::{
  client::{ClientError, IdentityClient, LedgerClient, Service},
  retry::RetryPolicy,
  user::{User, UserId},
};
use bounty_lifecycle::Lifecycle;
use bounty_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

// ─── Stubs ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct StubIdentity;

impl IdentityClient for StubIdentity {
  async fn resolve_token(&self, token: &str) -> Result<UserId, ClientError> {
    match token {
      "tok-aiko" => Ok(1),
      "tok-ben" => Ok(2),
      _ => Err(ClientError::Unauthorized {
        service: Service::Identity,
        message: "token invalid".into(),
      }),
    }
  }

  async fn list_users(&self) -> Result<Vec<User>, ClientError> {
    Ok(vec![
      User { id: 1, name: "Aiko".into() },
      User { id: 2, name: "Ben".into() },
    ])
  }
}

#[derive(Clone, Default)]
struct StubLedger {
  totals: Arc<Mutex<HashMap<UserId, i64>>>,
  down:   Arc<Mutex<bool>>,
}

impl LedgerClient for StubLedger {
  async fn post_delta(
    &self,
    user_id: UserId,
    amount: i64,
    _comment: &str,
  ) -> Result<(), ClientError> {
    if *self.down.lock().unwrap() {
      return Err(ClientError::Status {
        service: Service::Ledger,
        status:  500,
        message: "ledger exploded".into(),
      });
    }
    *self.totals.lock().unwrap().entry(user_id).or_default() += amount;
    Ok(())
  }

  async fn total_for(&self, user_id: UserId) -> Result<i64, ClientError> {
    Ok(self.totals.lock().unwrap().get(&user_id).copied().unwrap_or(0))
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

async fn app() -> (Router, StubLedger) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let ledger = StubLedger::default();
  let engine = Lifecycle::new(store, StubIdentity, ledger.clone()).with_retry(RetryPolicy {
    max_attempts: 1,
    base_delay:   Duration::ZERO,
    max_delay:    Duration::ZERO,
  });
  (api_router(Arc::new(engine)), ledger)
}

async fn call(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn create_post(app: &Router, point: i64) -> i64 {
  let (status, body) = call(
    app,
    "POST",
    "/posts",
    Some("tok-aiko"),
    Some(json!({ "body": "fix sink", "point": point, "tags": ["plumbing", "kitchen"] })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["post"]["id"].as_i64().unwrap()
}

// ─── Posts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_detail_with_tags_and_identities() {
  let (app, _) = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/posts",
    Some("tok-aiko"),
    Some(json!({ "body": "fix sink", "point": 100, "tags": ["plumbing"] })),
  )
  .await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["post"]["status"], "open");
  assert_eq!(body["post"]["requester_id"], 1);
  assert_eq!(body["requester"]["name"], "Aiko");
  assert_eq!(body["helper"]["id"], 0);
  assert_eq!(body["tags"][0]["body"], "plumbing");
}

#[tokio::test]
async fn create_without_token_is_401() {
  let (app, _) = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/posts",
    None,
    Some(json!({ "body": "fix sink", "point": 100 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["kind"], "auth");

  let (status, _) = call(
    &app,
    "POST",
    "/posts",
    Some("tok-nobody"),
    Some(json!({ "body": "fix sink", "point": 100 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_drafts_are_400() {
  let (app, _) = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/posts",
    Some("tok-aiko"),
    Some(json!({ "body": "fix sink", "point": -5 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "validation");

  let (status, body) =
    call(&app, "POST", "/posts", Some("tok-aiko"), Some(json!({ "point": 5 }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_post_is_404() {
  let (app, _) = app().await;
  let (status, body) = call(&app, "GET", "/posts/999", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");

  let (status, _) = call(&app, "GET", "/posts/not-a-number", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_and_expands() {
  let (app, _) = app().await;
  let first = create_post(&app, 10).await;
  let second = create_post(&app, 20).await;
  call(&app, "PUT", &format!("/posts/{first}/helper"), Some("tok-ben"), None).await;

  let (status, body) = call(&app, "GET", "/posts", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["post"]["id"], second);
  assert_eq!(body[1]["post"]["id"], first);
  assert!(body[0].get("tags").is_none());

  let (_, body) = call(&app, "GET", "/posts?helper_id=2&expand=tags", None, None).await;
  let items = body.as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["helper"]["name"], "Ben");
  assert_eq!(items[0]["tags"].as_array().unwrap().len(), 2);

  let (status, _) = call(&app, "GET", "/posts?expand=everything", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_requester_edits_and_deletes() {
  let (app, _) = app().await;
  let id = create_post(&app, 10).await;
  let uri = format!("/posts/{id}");

  let (status, body) =
    call(&app, "PUT", &uri, Some("tok-ben"), Some(json!({ "body": "mine now" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "domain");

  let (status, body) =
    call(&app, "PUT", &uri, Some("tok-aiko"), Some(json!({ "body": "fix sink fast" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["post"]["body"], "fix sink fast");

  let (status, _) = call(&app, "DELETE", &uri, Some("tok-aiko"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, "GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_lifecycle_moves_points() {
  let (app, ledger) = app().await;
  ledger.totals.lock().unwrap().insert(1, 500);
  let id = create_post(&app, 100).await;

  let (_, body) = call(&app, "GET", "/users/1/amount-payable", None, None).await;
  assert_eq!(body, json!({ "user_id": 1, "amount": 400 }));

  let (status, body) =
    call(&app, "POST", &format!("/posts/{id}/payment"), Some("tok-aiko"), None).await;
  assert_eq!(status, StatusCode::CONFLICT, "payment without helper: {body}");

  call(&app, "PUT", &format!("/posts/{id}/helper"), Some("tok-ben"), None).await;
  let (status, body) =
    call(&app, "POST", &format!("/posts/{id}/payment"), Some("tok-aiko"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["post"]["status"], "payment");

  let (status, _) =
    call(&app, "DELETE", &format!("/posts/{id}/helper"), Some("tok-ben"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) =
    call(&app, "POST", &format!("/posts/{id}/acceptance"), Some("tok-aiko"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["post"]["status"], "acceptance");

  let (_, body) = call(&app, "GET", "/users/1/amount-payable", None, None).await;
  assert_eq!(body["amount"], 400);
  let (_, body) = call(&app, "GET", "/users/2/amount-payable", None, None).await;
  assert_eq!(body["amount"], 100);
}

#[tokio::test]
async fn ledger_failure_is_reported_and_reconciled() {
  let (app, ledger) = app().await;
  let id = create_post(&app, 30).await;
  call(&app, "PUT", &format!("/posts/{id}/helper"), Some("tok-ben"), None).await;

  *ledger.down.lock().unwrap() = true;
  let (status, body) =
    call(&app, "POST", &format!("/posts/{id}/payment"), Some("tok-aiko"), None).await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["kind"], "collaborator");

  let (_, body) = call(&app, "GET", &format!("/posts/{id}"), None, None).await;
  assert_eq!(body["post"]["status"], "payment");

  *ledger.down.lock().unwrap() = false;
  let (status, body) = call(
    &app,
    "POST",
    "/settlements/reconcile?min_age_secs=0",
    Some("tok-aiko"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "settled": 1, "failed": 0, "skipped": 0 }));
  assert_eq!(ledger.totals.lock().unwrap().get(&1), Some(&-30));
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tag_search_posts_and_delete() {
  let (app, _) = app().await;
  let id = create_post(&app, 10).await;

  let (_, body) = call(&app, "GET", "/tags?q=PLUMB", None, None).await;
  let tags = body.as_array().unwrap();
  assert_eq!(tags.len(), 1);
  let tag_id = tags[0]["id"].as_i64().unwrap();

  let (_, body) = call(&app, "GET", &format!("/tags/{tag_id}/posts"), None, None).await;
  assert_eq!(body[0]["post"]["id"], id);
  assert_eq!(body[0]["requester"]["name"], "Aiko");

  let (status, _) = call(&app, "DELETE", &format!("/tags/{tag_id}"), None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) =
    call(&app, "DELETE", &format!("/tags/{tag_id}"), Some("tok-ben"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = call(&app, "GET", &format!("/tags/{tag_id}/posts"), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["kind"], "not_found");
}
